use crate::models::profile::{Education, Experience, ProfileDocument};

/// The built-in starting document: blank scalars with one empty education and
/// one empty experience row for the form to fill in.
pub fn sample_document() -> ProfileDocument {
    ProfileDocument {
        education: vec![Education {
            school: String::new(),
            degree: String::new(),
            years: String::new(),
        }],
        experience: vec![Experience {
            title: String::new(),
            company: String::new(),
            years: String::new(),
            description: String::new(),
        }],
        ..Default::default()
    }
}
