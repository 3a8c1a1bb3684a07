/// Splits a command line into words. Single and double quotes group words;
/// a quote of the other kind inside them is literal, and backslash escapes
/// work inside quotes. `""` yields an empty word.
pub fn parse_command(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut pending = false;
    let mut chars = command.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (None, '\'' | '"') => {
                quote = Some(ch);
                pending = true;
            }
            (Some(q), _) if ch == q => quote = None,
            (None, ' ' | '\t') => {
                if pending || !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                    pending = false;
                }
            }
            (Some(_), '\\') => match chars.next() {
                Some('n') => current.push('\n'),
                Some('t') => current.push('\t'),
                Some(next @ ('\\' | '\'' | '"')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            _ => current.push(ch),
        }
    }

    if pending || !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Non-empty, non-comment lines of a command script with their 1-based line
/// numbers.
pub fn script_lines(script: &str) -> impl Iterator<Item = (usize, &str)> {
    script
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}
