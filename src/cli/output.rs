//! Global output flags, carried via environment so every module can check
//! them without threading state.

pub fn is_json() -> bool {
    std::env::var("MORAY_JSON").as_deref() == Ok("1")
}

pub fn is_quiet() -> bool {
    std::env::var("MORAY_QUIET").as_deref() == Ok("1")
}

pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}
