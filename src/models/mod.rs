mod donor;

pub use donor::{DonorRecord, NewDonorRecord};
