pub mod attendance_record;
pub mod cluster;
pub mod course;
pub mod event;
pub mod location;
pub mod location_ping;
pub mod section;
pub mod student;

pub use attendance_record::Entity as AttendanceRecord;
pub use cluster::Entity as Cluster;
pub use course::Entity as Course;
pub use event::Entity as Event;
pub use location::Entity as Location;
pub use location_ping::Entity as LocationPing;
pub use section::Entity as Section;
pub use student::Entity as Student;
