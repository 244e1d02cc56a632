//! HTML pages: registration form, confirmation, student profile.
//!
//! Все пользовательские строки проходят через `escape_html`.

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::consts::QR_URL_PREFIX;
use crate::store::StudentRecord;

/// Characters escaped in a single URL path segment.
pub const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// URL of a generated QR image, as served by the static route.
pub fn qr_url(filename: &str) -> String {
    format!(
        "{}{}",
        QR_URL_PREFIX,
        utf8_percent_encode(filename, PATH_SEGMENT)
    )
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en\">\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n\
         </head>\n\
         <body>\n{}</body>\n\
         </html>\n",
        escape_html(title),
        body
    )
}

/// GET /
pub fn index_page() -> String {
    page(
        "Student Registration",
        "<h1>Student Registration</h1>\n\
         <form method=\"post\" action=\"/\">\n\
         <label>Name <input type=\"text\" name=\"name\" required></label><br>\n\
         <label>Grade <input type=\"text\" name=\"grade\" required></label><br>\n\
         <label>Contact <input type=\"text\" name=\"contact\" required></label><br>\n\
         <button type=\"submit\">Register</button>\n\
         </form>\n",
    )
}

/// POST / (success). `filename` is the QR image under the static QR route.
pub fn result_page(filename: &str, name: &str, grade: &str, profile_url: &str) -> String {
    let body = format!(
        "<h1>Registered</h1>\n\
         <p>{} (grade {})</p>\n\
         <img src=\"{}\" alt=\"QR code\">\n\
         <p><a href=\"{}\">{}</a></p>\n\
         <p><a href=\"/\">Register another student</a></p>\n",
        escape_html(name),
        escape_html(grade),
        escape_html(&qr_url(filename)),
        escape_html(profile_url),
        escape_html(profile_url),
    );
    page("Registration complete", &body)
}

/// GET /student/{id} (found).
pub fn student_page(rec: &StudentRecord) -> String {
    let body = format!(
        "<h1>Student Profile</h1>\n\
         <dl>\n\
         <dt>Name</dt><dd>{}</dd>\n\
         <dt>Grade</dt><dd>{}</dd>\n\
         <dt>Contact</dt><dd>{}</dd>\n\
         </dl>\n",
        escape_html(&rec.name),
        escape_html(&rec.grade),
        escape_html(&rec.contact),
    );
    page(&format!("{} - Profile", rec.name), &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<b>\"A&B\"</b>'"),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#39;"
        );
    }

    #[test]
    fn result_page_references_qr_file() {
        let html = result_page("Asha_5_x.png", "Asha", "5", "http://10.0.0.2:5000/student/x");
        assert!(html.contains("src=\"/static/qrcodes/Asha_5_x.png\""));
        assert!(html.contains("Asha (grade 5)"));
    }

    #[test]
    fn qr_url_encodes_segment() {
        assert_eq!(qr_url("A#1_5_x.png"), "/static/qrcodes/A%231_5_x.png");
    }

    #[test]
    fn profile_page_does_not_inject() {
        let rec = StudentRecord {
            student_id: "id".into(),
            name: "<script>".into(),
            grade: "5".into(),
            contact: "c".into(),
        };
        let html = student_page(&rec);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
