//! Parsers for the listing output of `unzip -l` and `tar -t`

/// Extracts entry names from the tabular output of `unzip -l`.
///
/// ```text
/// Archive:  test.zip
///   Length      Date    Time    Name
/// ---------  ---------- -----   ----
///         5  2024-01-01 10:00   a.txt
///         0  2024-01-01 10:00   b/
/// ---------                     -------
///         5                     2 files
/// ```
pub fn parse_unzip_listing(output: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut in_table = false;

    for line in output.lines() {
        let trimmed = line.trim();
        if !in_table {
            in_table = ["Length", "Date", "Time", "Name"]
                .iter()
                .all(|column| trimmed.contains(column));
            continue;
        }

        if trimmed.is_empty() || is_separator(trimmed) {
            continue;
        }

        if let Some(name) = unzip_entry_name(trimmed) {
            entries.push(name);
        } else if trimmed.contains("file") && !trimmed.contains('.') {
            break;
        }
    }

    entries
}

fn unzip_entry_name(line: &str) -> Option<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 4 {
        return None;
    }
    let is_entry = tokens[0].parse::<u64>().is_ok()
        && tokens[1].contains('-')
        && tokens[2].contains(':');
    is_entry.then(|| tokens[3..].join(" "))
}

/// Reads the total uncompressed size from the summary line of an `unzip`
/// listing. Returns `0` when no summary line is present.
pub fn parse_unzip_total_size(output: &str) -> u64 {
    let lines: Vec<&str> = output.lines().collect();

    let summary = lines
        .iter()
        .rev()
        .find(|line| line.contains("files") && line.contains("bytes"))
        .or_else(|| {
            // `unzip -l` prints "<bytes> <count> file(s)" without the word "bytes"
            lines
                .iter()
                .rev()
                .find(|line| line.contains("file") && !line.contains(':'))
        });

    summary
        .and_then(|line| line.split_whitespace().next())
        .and_then(|token| token.parse().ok())
        .unwrap_or(0)
}

/// Extracts entry names from `tar -t` output, one entry per line.
///
/// Lines in the verbose format (`-rw-r--r-- user group 2024-01-01 data.txt`)
/// contribute their last whitespace separated token.
pub fn parse_tar_listing(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_separator(line) && !line.contains("total"))
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            let first = tokens.next()?;
            Some(tokens.last().unwrap_or(first).to_string())
        })
        .collect()
}

fn is_separator(line: &str) -> bool {
    line.chars()
        .all(|c| c == '-' || c == '=' || c.is_whitespace())
}
