mod events_test;
mod health_test;
mod locations_test;
