//! Console output for startup and shutdown

/// Print a success message followed by indented details
pub fn print_success(message: &str, details: &[&str]) {
    println!("✓ {message}");
    for line in details {
        println!("  {line}");
    }
}

/// Print an error with suggestions for the operator
pub fn print_error(message: &str, suggestions: &[&str]) {
    eprintln!("✗ {message}");
    if !suggestions.is_empty() {
        eprintln!();
        for line in suggestions {
            eprintln!("  - {line}");
        }
    }
}
