//! Route table for the JSON API

/// All routes defined in the application
pub const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/api/health", "Health check"),

    // Caesar
    ("POST", "/api/caesar/encrypt", "Shift text forward"),
    ("POST", "/api/caesar/decrypt", "Shift text back"),
    ("POST", "/api/caesar/attack", "Rank all 26 shifts"),

    // Transposition
    ("POST", "/api/transposition/encrypt", "Columnar transposition"),
    ("POST", "/api/transposition/decrypt", "Undo a columnar transposition"),
    ("POST", "/api/transposition/attack", "Search key lengths and read orders"),

    // RSA
    ("POST", "/api/rsa/generate", "Fresh weak or strong key pair"),
    ("POST", "/api/rsa/encrypt", "Encrypt under (e, n)"),
    ("POST", "/api/rsa/decrypt", "Decrypt under (d, n)"),
    ("POST", "/api/rsa/attack", "Factor n and decrypt"),

    // Triple lock
    ("POST", "/api/triple/encrypt", "Caesar, then transposition, then RSA"),
    ("POST", "/api/triple/attack", "Break RSA, transposition and Caesar in turn"),
];

/// Print all routes
pub fn print_routes() {
    println!("\nTriple-Lock API Routes:");
    println!("{:-<70}", "");
    for (method, path, desc) in ROUTES {
        println!("{:6} {:30} {}", method, path, desc);
    }
    println!();
}
