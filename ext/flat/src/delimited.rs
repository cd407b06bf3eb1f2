//! Field splitting for delimited lines.

/// Split `line` on `delimiter`, honoring `quote` if given.
///
/// A field that starts with the quote character runs to the matching closing quote;
/// a doubled quote inside it is a literal quote. Text between a closing quote and the
/// next delimiter is kept as-is.
///
/// ```
/// use strata_flat::split_fields;
///
/// assert_eq!(split_fields("a,b,,c", ',', None), ["a", "b", "", "c"]);
/// assert_eq!(split_fields(r#"1,"x, ""y""",2"#, ',', Some('"')), ["1", r#"x, "y""#, "2"]);
/// ```
#[must_use]
pub fn split_fields(line: &str, delimiter: char, quote: Option<char>) -> Vec<String> {
    let Some(quote) = quote else {
        return line.split(delimiter).map(str::to_owned).collect();
    };

    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut at_field_start = true;
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == quote {
                if chars.peek() == Some(&quote) {
                    chars.next();
                    field.push(quote);
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
            continue;
        }

        if c == delimiter {
            fields.push(std::mem::take(&mut field));
            at_field_start = true;
            continue;
        }
        if c == quote && at_field_start {
            in_quotes = true;
        } else {
            field.push(c);
        }
        at_field_start = false;
    }
    fields.push(field);
    fields
}
