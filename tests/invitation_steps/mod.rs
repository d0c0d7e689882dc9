//! Step definitions for invitation lifecycle BDD scenarios.


mod given;
mod then;
mod when;
