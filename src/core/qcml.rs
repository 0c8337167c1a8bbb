//! qcML parsing shared by the qcML based report modules.
//!
//! A qcML document carries `qualityParameter` and `metaDataParameter`
//! elements in the `http://www.prime-xs.eu/ms/qcml` namespace, each with
//! `name`, `value` and optional `description`/`accession` attributes.

use crate::core::model::{ReadType, Row, Value};
use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use roxmltree::{Document, ParsingOptions};

pub const QCML_NS: &str = "http://www.prime-xs.eu/ms/qcml";

pub const QUALITY_PARAMETER: &str = "qualityParameter";
pub const METADATA_PARAMETER: &str = "metaDataParameter";

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParamMeta {
    pub description: String,
    pub accession: String,
}

/// Parameter metadata accumulated over every parsed file, in first-seen order.
#[derive(Debug, Default)]
pub struct QcmlParser {
    meta: IndexMap<String, ParamMeta>,
}

/// ngs-bits writes an internal DTD subset (`<!DOCTYPE catelog [...]>`) ahead
/// of the root element.
fn parse_document(xml: &str) -> Result<Document<'_>> {
    let opt = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, opt).context("invalid qcML document")
}

impl QcmlParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the `tag` parameters of one document as a name/value row.
    ///
    /// Values starting with `n/a` are skipped and leave no metadata behind.
    pub fn parse_by(&mut self, xml: &str, tag: &str) -> Result<Row> {
        let doc = parse_document(xml)?;
        let mut row = Row::new();

        for node in doc
            .descendants()
            .filter(|n| n.is_element() && n.has_tag_name((QCML_NS, tag)))
        {
            let value = required_attr(&node, "value", tag)?;
            if value.starts_with("n/a") {
                continue;
            }
            let name = normalize_name(required_attr(&node, "name", tag)?);
            row.insert(name.clone(), Value::parse(value));
            self.insert(
                name,
                ParamMeta {
                    description: node.attribute("description").unwrap_or("").to_string(),
                    accession: node.attribute("accession").unwrap_or("").to_string(),
                },
            );
        }
        Ok(row)
    }

    pub fn insert(&mut self, name: impl Into<String>, meta: ParamMeta) {
        self.meta.insert(name.into(), meta);
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamMeta> {
        self.meta.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamMeta> {
        self.meta.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.meta.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamMeta)> {
        self.meta.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Description text for one or more parameters; several become an HTML list.
    pub fn make_description(&self, keys: &[&str]) -> Result<String> {
        let lookup = |k: &str| {
            self.get(k)
                .map(|m| m.description.as_str())
                .ok_or_else(|| anyhow!("unknown qcML parameter '{}'", k))
        };
        if keys.len() == 1 {
            return Ok(lookup(keys[0])?.to_string());
        }
        let mut out = String::from("<ul>");
        for k in keys {
            out.push_str("<li>");
            out.push_str(lookup(k)?);
            out.push_str("</li>");
        }
        out.push_str("</ul>");
        Ok(out)
    }
}

fn required_attr<'a>(node: &roxmltree::Node<'a, '_>, attr: &str, tag: &str) -> Result<&'a str> {
    node.attribute(attr).ok_or_else(|| {
        let pos = node.document().text_pos_at(node.range().start);
        anyhow!("{} at {} is missing the '{}' attribute", tag, pos, attr)
    })
}

/// `"<x> percentage"` becomes `"<x> %"`; any other name is kept as is.
pub fn normalize_name(name: &str) -> String {
    match name.strip_suffix(" percentage") {
        Some(stem) => format!("{} %", stem),
        None => name.to_string(),
    }
}

/// Classify pairing from the `source file` metadata of one document.
pub fn read_type(xml: &str) -> Result<ReadType> {
    let doc = parse_document(xml)?;
    let mut r1 = false;
    let mut r2 = false;

    for node in doc
        .descendants()
        .filter(|n| n.is_element() && n.has_tag_name((QCML_NS, METADATA_PARAMETER)))
    {
        let value = required_attr(&node, "value", METADATA_PARAMETER)?;
        if value.starts_with("n/a") {
            continue;
        }
        if required_attr(&node, "name", METADATA_PARAMETER)? != "source file" {
            continue;
        }
        if value.contains("R1") {
            r1 = true;
        } else if value.contains("R2") {
            r2 = true;
        }
    }

    Ok(match (r1, r2) {
        (true, true) => ReadType::PairedEnd,
        (true, false) | (false, true) => ReadType::Single,
        (false, false) => ReadType::Unknown,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a minimal ReadQC qcML document.
    pub(crate) fn qcml_doc(source_files: &[&str], params: &[(&str, &str)]) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <qcML version=\"0.0.8\" xmlns=\"http://www.prime-xs.eu/ms/qcml\">\n\
             <runQuality ID=\"rq0001\">\n\
             <metaDataParameter ID=\"md0001\" name=\"creation software\" value=\"ReadQC 2018_11\" cvRef=\"QC\" accession=\"QC:1000002\"/>\n",
        );
        for (i, f) in source_files.iter().enumerate() {
            xml.push_str(&format!(
                "<metaDataParameter ID=\"md{:04}\" name=\"source file\" value=\"{}\" cvRef=\"QC\" accession=\"QC:1000005\"/>\n",
                i + 2,
                f
            ));
        }
        for (i, (name, value)) in params.iter().enumerate() {
            xml.push_str(&format!(
                "<qualityParameter ID=\"qp{:04}\" name=\"{}\" description=\"{} description\" value=\"{}\" cvRef=\"QC\" accession=\"QC:20000{:02}\"/>\n",
                i + 1,
                name,
                name,
                value,
                i + 1
            ));
        }
        xml.push_str("</runQuality>\n</qcML>\n");
        xml
    }

    #[test]
    fn parses_values_and_metadata() {
        let xml = qcml_doc(
            &["S1_R1.fastq.gz"],
            &[("read count", "100"), ("read length", "151"), ("base distribution plot", "img")],
        );
        let mut parser = QcmlParser::new();
        let row = parser.parse_by(&xml, QUALITY_PARAMETER).unwrap();
        assert_eq!(row.get("read count"), Some(&Value::Number(100.0)));
        assert_eq!(row.get("read length"), Some(&Value::Number(151.0)));
        assert_eq!(
            row.get("base distribution plot"),
            Some(&Value::Text("img".to_string()))
        );
        let meta = parser.get("read count").unwrap();
        assert_eq!(meta.description, "read count description");
        assert_eq!(meta.accession, "QC:2000001");
        let order: Vec<&str> = parser.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["read count", "read length", "base distribution plot"]);
    }

    #[test]
    fn parses_ngs_bits_prolog() {
        let xml = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n\
<?xml-stylesheet type=\"text/xml\" href=\"#stylesheet\"?>\n\
<!DOCTYPE catelog [\n\
  <!ATTLIST xsl:stylesheet\n\
  id\tID\t#REQUIRED>\n\
  ]>\n\
<qcML version=\"0.0.8\" xmlns=\"http://www.prime-xs.eu/ms/qcml\" >\n\
  <runQuality ID=\"rq0001\">\n\
    <metaDataParameter ID=\"md0001\" name=\"creation software\" value=\"ReadQC 2018_11-42-g4ed2d4f\" cvRef=\"QC\" accession=\"QC:1000002\"/>\n\
    <metaDataParameter ID=\"md0002\" name=\"source file\" value=\"S1_R1_001.fastq.gz\" cvRef=\"QC\" accession=\"QC:1000005\"/>\n\
    <metaDataParameter ID=\"md0003\" name=\"source file\" value=\"S1_R2_001.fastq.gz\" cvRef=\"QC\" accession=\"QC:1000005\"/>\n\
    <qualityParameter ID=\"qp0001\" name=\"read count\" description=\"Total number of reads (one cluster in a paired-end experiment generates two reads).\" value=\"1966342\" cvRef=\"QC\" accession=\"QC:2000005\"/>\n\
    <qualityParameter ID=\"qp0002\" name=\"Q30 base percentage\" description=\"The percentage of bases with a minimum quality score of Q30.\" value=\"93.66\" cvRef=\"QC\" accession=\"QC:2000008\"/>\n\
  </runQuality>\n\
  <xsl:stylesheet id=\"stylesheet\" version=\"1.0\" xmlns:xsl=\"http://www.w3.org/1999/XSL/Transform\" xmlns:ns=\"http://www.prime-xs.eu/ms/qcml\">\n\
    <xsl:template match=\"/\"><html><body><xsl:value-of select=\"@name\"/></body></html></xsl:template>\n\
  </xsl:stylesheet>\n\
</qcML>\n";

        let mut parser = QcmlParser::new();
        let row = parser.parse_by(xml, QUALITY_PARAMETER).unwrap();
        assert_eq!(row.get("read count"), Some(&Value::Number(1966342.0)));
        assert_eq!(row.get("Q30 base %"), Some(&Value::Number(93.66)));
        assert_eq!(parser.get("read count").unwrap().accession, "QC:2000005");
        assert_eq!(read_type(xml).unwrap(), ReadType::PairedEnd);
    }

    #[test]
    fn metadata_removal_keeps_order() {
        let xml = qcml_doc(&[], &[("a", "1"), ("b", "2"), ("c", "3")]);
        let mut parser = QcmlParser::new();
        parser.parse_by(&xml, QUALITY_PARAMETER).unwrap();
        assert!(parser.remove("b").is_some());
        parser.insert("d", ParamMeta::default());
        let order: Vec<&str> = parser.iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec!["a", "c", "d"]);
    }

    #[test]
    fn renames_percentage_suffix_only() {
        let xml = qcml_doc(&[], &[("Q20 read percentage", "97.5"), ("GC percent", "41")]);
        let mut parser = QcmlParser::new();
        let row = parser.parse_by(&xml, QUALITY_PARAMETER).unwrap();
        assert_eq!(row.get("Q20 read %"), Some(&Value::Number(97.5)));
        assert!(!row.contains_key("Q20 read percentage"));
        assert_eq!(row.get("GC percent"), Some(&Value::Number(41.0)));
        assert!(parser.contains("Q20 read %"));
        assert_eq!(normalize_name("percentage of reads"), "percentage of reads");
    }

    #[test]
    fn skips_not_available_values() {
        let xml = qcml_doc(&[], &[("read count", "10"), ("adapter %", "n/a (disabled)")]);
        let mut parser = QcmlParser::new();
        let row = parser.parse_by(&xml, QUALITY_PARAMETER).unwrap();
        assert!(!row.contains_key("adapter %"));
        assert!(!parser.contains("adapter %"));
        assert_eq!(row.len(), 1);
    }

    #[test]
    fn missing_optional_attributes_become_empty() {
        let xml = "<qcML xmlns=\"http://www.prime-xs.eu/ms/qcml\"><runQuality>\
                   <qualityParameter name=\"read count\" value=\"5\"/>\
                   </runQuality></qcML>";
        let mut parser = QcmlParser::new();
        parser.parse_by(xml, QUALITY_PARAMETER).unwrap();
        assert_eq!(parser.get("read count"), Some(&ParamMeta::default()));
    }

    #[test]
    fn ignores_elements_outside_namespace() {
        let xml = "<qcML><qualityParameter name=\"read count\" value=\"5\"/></qcML>";
        let mut parser = QcmlParser::new();
        let row = parser.parse_by(xml, QUALITY_PARAMETER).unwrap();
        assert!(row.is_empty());
    }

    #[test]
    fn missing_value_is_an_error() {
        let xml = "<qcML xmlns=\"http://www.prime-xs.eu/ms/qcml\">\
                   <qualityParameter name=\"read count\"/></qcML>";
        let mut parser = QcmlParser::new();
        assert!(parser.parse_by(xml, QUALITY_PARAMETER).is_err());
    }

    #[test]
    fn malformed_xml_is_an_error() {
        let mut parser = QcmlParser::new();
        assert!(parser.parse_by("<qcML><unclosed></qcML>", QUALITY_PARAMETER).is_err());
        assert!(read_type("not xml").is_err());
    }

    #[test]
    fn detects_read_type() {
        let paired = qcml_doc(&["a_R1.fastq", "a_R2.fastq"], &[]);
        let single = qcml_doc(&["a_R1.fastq"], &[]);
        let single_r2 = qcml_doc(&["a_R2.fastq"], &[]);
        let unknown = qcml_doc(&["a.fastq"], &[]);
        assert_eq!(read_type(&paired).unwrap(), ReadType::PairedEnd);
        assert_eq!(read_type(&single).unwrap(), ReadType::Single);
        assert_eq!(read_type(&single_r2).unwrap(), ReadType::Single);
        assert_eq!(read_type(&unknown).unwrap(), ReadType::Unknown);
    }

    #[test]
    fn describes_one_or_many() {
        let xml = qcml_doc(&[], &[("read count", "1"), ("read length", "2")]);
        let mut parser = QcmlParser::new();
        parser.parse_by(&xml, QUALITY_PARAMETER).unwrap();
        assert_eq!(
            parser.make_description(&["read count"]).unwrap(),
            "read count description"
        );
        assert_eq!(
            parser.make_description(&["read count", "read length"]).unwrap(),
            "<ul><li>read count description</li><li>read length description</li></ul>"
        );
        assert!(parser.make_description(&["nope"]).is_err());
    }
}
