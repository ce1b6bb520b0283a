//! Path fuzz target: build a field from arbitrary text, then set and read it back.
//! Parsing may fail; a field that builds must round-trip a value without panicking.
//! Build with: cargo fuzz run path_fuzz (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    let field = match fieldmap::Field::new(s) {
        Ok(f) => f,
        Err(_) => return,
    };
    let mut root = fieldmap::Value::map();
    // Indices above the write limit are refused without padding.
    if field.set(&mut root, fieldmap::Value::Int(1)).is_ok() {
        assert_eq!(field.get(&root).ok(), Some(fieldmap::Value::Int(1)));
        let _ = field.delete(&mut root);
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run path_fuzz");
}
