//! Integration-style tests exercising the ride engine end to end.

mod test_helpers;
