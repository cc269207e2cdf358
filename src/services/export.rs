//! CSV rendering for staff exports.

use std::borrow::Cow;

/// Quotes a field when it contains a comma, quote or line break
pub fn csv_field(value: &str) -> Cow<'_, str> {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Accumulates CSV lines terminated by `\n`
#[derive(Debug, Default)]
pub struct CsvBuilder {
    out: String,
}

impl CsvBuilder {
    pub fn with_header(columns: &[&str]) -> Self {
        let mut builder = Self::default();
        builder.push_line(columns.iter().copied());
        builder
    }

    pub fn row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let fields: Vec<S> = fields.into_iter().collect();
        self.push_line(fields.iter().map(|f| f.as_ref()));
    }

    fn push_line<'a>(&mut self, fields: impl Iterator<Item = &'a str>) {
        let line = fields.map(csv_field).collect::<Vec<_>>().join(",");
        self.out.push_str(&line);
        self.out.push('\n');
    }

    pub fn finish(self) -> String {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_fields_are_untouched() {
        assert_eq!(csv_field("Ibuprofen 200mg"), "Ibuprofen 200mg");
    }

    #[test]
    fn special_characters_are_quoted() {
        assert_eq!(csv_field("Main St, Branch"), "\"Main St, Branch\"");
        assert_eq!(csv_field("5\" strip"), "\"5\"\" strip\"");
        assert_eq!(csv_field("line\nbreak"), "\"line\nbreak\"");
    }

    #[test]
    fn builder_renders_header_and_rows() {
        let mut csv = CsvBuilder::with_header(&["sku", "product"]);
        csv.row(["AMX-500", "Amoxicillin, 500mg"]);
        csv.row(vec!["PAR-1".to_string(), "Paracetamol".to_string()]);
        assert_eq!(
            csv.finish(),
            "sku,product\nAMX-500,\"Amoxicillin, 500mg\"\nPAR-1,Paracetamol\n"
        );
    }
}
