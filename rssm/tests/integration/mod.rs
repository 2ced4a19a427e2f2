mod cli_tests;
#[cfg(unix)]
mod copy_tests;
#[cfg(unix)]
mod exec_tests;
