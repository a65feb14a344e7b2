mod check_in_test;
mod codes_test;
mod me_test;
