pub mod device;
pub mod report;
pub mod session;
pub mod token;
pub mod verification;
