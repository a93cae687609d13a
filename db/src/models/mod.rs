pub mod attendance_record;
pub mod batch;
pub mod batch_student;
pub mod class_session;
pub mod course;
pub mod device_binding;
pub mod user;
