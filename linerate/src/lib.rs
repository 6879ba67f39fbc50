#![doc(issue_tracker_base_url = "https://github.com/chainbound/linerate/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod cli;

pub use linerate_bucket::TokenBucket;
pub use linerate_common::*;
pub use linerate_dispatch::*;
pub use linerate_wire::strip_timestamp;
