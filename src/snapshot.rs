use crate::interpreter::state::MachineState;

/// Independent copy of a machine tagged with the identity of the program
/// it was running. Serialization is left to the caller; the field layout
/// of `state` (memory, registers, stack, ...) is what has to round-trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: MachineState,
    pub program_identity: String,
}

impl Snapshot {
    pub fn new(state: MachineState, program_identity: impl Into<String>) -> Snapshot {
        Snapshot { state, program_identity: program_identity.into() }
    }

    pub fn is_for(&self, program_identity: &str) -> bool {
        self.program_identity == program_identity
    }
}
