use std::io::{self, Write};

/// Helper function to read a line from stdin
pub fn read_line() -> io::Result<String> {
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Helper function to prompt for input with confirmation
pub fn prompt_with_confirmation(prompt: &str, confirmation: &str) -> io::Result<bool> {
    println!("{}", prompt);
    print!("{} (y/n): ", confirmation);
    io::stdout().flush()?;

    let response = read_line()?.to_lowercase();
    Ok(response.is_empty() || response == "y")
}

/// Validate an email address of the shape `local@domain.tld`
///
/// The local part allows `[A-Za-z0-9._%+-]`, the domain `[A-Za-z0-9.-]`,
/// and the final label must be at least two ASCII letters.
pub fn is_valid_email(email: &str) -> bool {
    let (local, domain) = match email.split_once('@') {
        Some(parts) => parts,
        None => return false,
    };

    if local.is_empty()
        || !local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c))
    {
        return false;
    }

    let (host, tld) = match domain.rsplit_once('.') {
        Some(parts) => parts,
        None => return false,
    };

    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}
