//! Rules listing command.

/// Prints every registered rule and analyzer with its description.
pub fn run() {
    println!("Available rules:\n");
    for info in gosentry_rules::generators() {
        println!("  {} - {}", info.id, info.description);
    }
    for info in gosentry_rules::analyzers() {
        println!("  {} - {} (analyzer)", info.id, info.description);
    }
}
