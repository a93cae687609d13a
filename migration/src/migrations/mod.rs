pub mod m202608010001_create_users;
pub mod m202608010002_create_courses;
pub mod m202608010003_create_class_sessions;
pub mod m202608010004_create_attendance;
