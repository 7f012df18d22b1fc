mod helpers;

mod accessor_tests;
