pub mod profile;

pub use profile::{
    download_filename, Certification, DateRange, Education, Experience, ProfileRecord,
    ProfileSections,
};
