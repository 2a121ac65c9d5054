pub mod m202510010001_create_directory;
pub mod m202510010002_create_locations;
pub mod m202510010003_create_events;
pub mod m202510010004_create_attendance_records;
pub mod m202510010005_create_location_pings;
