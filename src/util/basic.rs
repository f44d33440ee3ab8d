// The universal basic string error type.
// Complex failure modes get their own types where callers need to branch on
// them (see note::import). Everything else just propagates a message.
pub type SError = String;
