//! Reserved identifiers of the messaging vocabulary.

use xdi_core::{ClassSymbol, Segment, SubSegment};

fn dollar(body: &str) -> Segment {
    Segment::from_sub_segment(SubSegment::classed(ClassSymbol::Dollar, body))
}

/// The `$get` operation XRI.
pub fn xri_get() -> Segment {
    dollar("get")
}

/// The `$set` operation XRI.
pub fn xri_set() -> Segment {
    dollar("set")
}

/// The `$del` operation XRI.
pub fn xri_del() -> Segment {
    dollar("del")
}

/// The `$secret$token$valid` path a successful secret-token check marks
/// on the message.
pub fn xri_secret_token_valid() -> Segment {
    dollar("secret")
        .concat(&dollar("token"))
        .concat(&dollar("valid"))
}
