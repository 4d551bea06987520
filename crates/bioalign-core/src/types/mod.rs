pub mod document;
pub mod label;
pub mod record;

pub use document::{
    char_slice, zip_tagged, Document, EntitySpan, TaggedToken, Token, TokenizedDocument,
};
pub use label::{first_iob2_violation, is_valid_iob2, BioTag, EntityLabel, LabelMap, TagSet};
pub use record::{
    Anchor, AnchoredRecord, InputRecord, PreTokenizedRecord, RawEntity, RawOffset,
    RawTextRecord, RecordSchema, TagValue,
};
