mod common;
mod geofence;
