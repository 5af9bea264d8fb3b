//! Console prompts.

use std::io::{self, BufRead, Write};

fn read_answer<R: BufRead, W: Write>(input: &mut R, out: &mut W, question: &str) -> io::Result<String> {
    write!(out, "{question}")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Ask for the person's name. Validation happens in the caller.
pub fn prompt_name<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> io::Result<String> {
    read_answer(input, out, "\nEnter person's name: ")
}

/// Ask whether an existing folder may be overwritten. Only `yes` confirms.
pub fn confirm_overwrite<R: BufRead, W: Write>(input: &mut R, out: &mut W, name: &str) -> io::Result<bool> {
    writeln!(out, "\n'{name}' already exists!")?;
    let answer = read_answer(input, out, "Overwrite? (yes/no): ")?;
    Ok(answer.eq_ignore_ascii_case("yes"))
}
