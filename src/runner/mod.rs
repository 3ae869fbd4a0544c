pub mod compiler;
pub mod def;
pub mod definition;
pub mod ds;
pub mod script;
pub mod std_lib;
