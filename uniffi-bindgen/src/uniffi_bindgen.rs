//! Generates Swift and Kotlin bindings for `keychainkit`.

fn main() {
    uniffi::uniffi_bindgen_main();
}
