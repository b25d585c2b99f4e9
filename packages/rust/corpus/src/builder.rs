//! Raw course record → indexed course document.

use coursepilot_shared::{CourseDocument, CourseRecord, NO_PREREQUISITES, SearchableFields};
use coursepilot_text::clean;

use crate::identity::document_id;

/// Build one document per record, preserving input order.
pub fn build(records: &[CourseRecord]) -> Vec<CourseDocument> {
    records.iter().map(build_document).collect()
}

/// Build the display form, searchable form, embedding text, and id of a
/// single record. Missing fields are treated as empty text.
pub fn build_document(record: &CourseRecord) -> CourseDocument {
    let display_text = display_text(record);
    let fields = searchable_fields(record);
    let document_text = document_text(&fields);
    let document_id = document_id(&fields);

    CourseDocument {
        document_id,
        display_text,
        fields,
        document_text,
    }
}

fn raw(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or("").trim()
}

/// Original casing and punctuation, trimmed.
fn display_text(record: &CourseRecord) -> String {
    let prerequisites = match raw(&record.prerequisites) {
        "" => NO_PREREQUISITES,
        p => p,
    };
    format!(
        "Subject: {}\nTitle: {}\nCatalog Number: {}\nCourse Type: {}\nDescription: {}\nGrading: {}\nPrerequisites: {}",
        raw(&record.subject),
        raw(&record.title),
        raw(&record.catalog_number),
        raw(&record.course_type),
        raw(&record.description),
        raw(&record.grading),
        prerequisites,
    )
}

fn normalized(field: &Option<String>) -> String {
    clean(&raw(field).to_lowercase())
}

fn searchable_fields(record: &CourseRecord) -> SearchableFields {
    let course_type = clean(&raw(&record.course_type).to_lowercase().replace('-', " "));

    let mut prerequisites = normalized(&record.prerequisites);
    if prerequisites.is_empty() {
        prerequisites = NO_PREREQUISITES.to_string();
    }

    SearchableFields {
        subject: normalized(&record.subject),
        title: normalized(&record.title),
        catalog_number: normalized(&record.catalog_number),
        course_type,
        description: normalized(&record.description),
        keywords: normalized(&record.keywords),
        grading: normalized(&record.grading),
        prerequisites,
    }
}

fn document_text(fields: &SearchableFields) -> String {
    format!(
        "Subject: {}\nTitle: {}\nCatalog Number: {}\nCourse Type: {}\nDescription: {}\nKeywords: {}\nGrading: {}\nPrerequisites: {}",
        fields.subject,
        fields.title,
        fields.catalog_number,
        fields.course_type,
        fields.description,
        fields.keywords,
        fields.grading,
        fields.prerequisites,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CourseRecord {
        CourseRecord {
            subject: Some(" CS ".into()),
            title: Some("Foundations of Artificial Intelligence".into()),
            catalog_number: Some("5100".into()),
            course_type: Some("Lecture-Lab".into()),
            description: Some("Introduces the fundamental problems, theories, and algorithms of AI.".into()),
            keywords: Some("AI, search, planning".into()),
            grading: Some("Graduate Letter Grade".into()),
            prerequisites: Some("".into()),
        }
    }

    #[test]
    fn display_text_preserves_original_casing() {
        let doc = build_document(&record());
        assert_eq!(
            doc.display_text,
            "Subject: CS\nTitle: Foundations of Artificial Intelligence\nCatalog Number: 5100\n\
             Course Type: Lecture-Lab\n\
             Description: Introduces the fundamental problems, theories, and algorithms of AI.\n\
             Grading: Graduate Letter Grade\nPrerequisites: None"
        );
    }

    #[test]
    fn searchable_fields_are_cleaned() {
        let doc = build_document(&record());
        assert_eq!(doc.fields.subject, "cs");
        assert_eq!(doc.fields.title, "foundations artificial intelligence");
        assert_eq!(doc.fields.course_type, "lecture lab");
        assert_eq!(
            doc.fields.description,
            "introduces fundamental problems theories algorithms ai"
        );
        assert_eq!(doc.fields.keywords, "ai search planning");
        assert_eq!(doc.fields.prerequisites, NO_PREREQUISITES);
    }

    #[test]
    fn document_text_has_labeled_lines() {
        let doc = build_document(&record());
        let lines: Vec<_> = doc.document_text.lines().collect();
        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "Subject: cs");
        assert_eq!(lines[5], "Keywords: ai search planning");
        assert_eq!(lines[7], "Prerequisites: None");
    }

    #[test]
    fn prerequisites_cleaned_to_nothing_become_none() {
        let mut r = record();
        r.prerequisites = Some("--".into());
        let doc = build_document(&r);
        assert_eq!(doc.fields.prerequisites, NO_PREREQUISITES);
        // Display keeps what the catalog actually says.
        assert!(doc.display_text.ends_with("Prerequisites: --"));
    }

    #[test]
    fn empty_record_still_builds() {
        let doc = build_document(&CourseRecord::default());
        assert!(doc.display_text.starts_with("Subject: \nTitle: \n"));
        assert!(doc.display_text.ends_with("Prerequisites: None"));
        assert_eq!(doc.fields.subject, "");
        assert_eq!(doc.fields.prerequisites, NO_PREREQUISITES);
        assert_eq!(doc.document_id.len(), 64);
    }

    #[test]
    fn casing_differences_share_an_id() {
        let mut shouted = record();
        shouted.subject = Some("cs".into());
        shouted.title = Some("FOUNDATIONS OF ARTIFICIAL INTELLIGENCE".into());
        shouted.catalog_number = Some("5100".into());

        let a = build_document(&record());
        let b = build_document(&shouted);
        assert_eq!(a.document_id, b.document_id);
        assert_ne!(a.display_text, b.display_text);
    }

    #[test]
    fn build_preserves_order() {
        let mut second = record();
        second.title = Some("Compilers".into());
        let docs = build(&[record(), second]);
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].fields.title, "compilers");
    }
}
