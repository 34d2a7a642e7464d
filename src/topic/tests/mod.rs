//! Test modules for topic fan-out
