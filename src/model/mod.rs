mod certificate;
mod criteria;
mod padding;
mod scheme;

pub use certificate::ClientCertificate;
pub use criteria::SelectionCriteria;
pub use padding::{HashAlgorithm, PssPadding};
pub use scheme::SignatureScheme;
