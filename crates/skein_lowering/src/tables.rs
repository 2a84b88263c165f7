//! The lowered program: what the external emitter consumes.
//!
//! Everything here is plain, owned data — no symbol ids, no interner
//! handles — so the tables serialize as-is and byte-identical tables
//! mean byte-identical generated machines.

use serde::{Deserialize, Serialize};
use skein_flow::RegisterId;
use std::fmt;

/// A canonical state number. Real states are dense from 0; the two
/// lifecycle sentinels live at the top of the range.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    /// The machine's state before the first successful step.
    pub const NOT_STARTED: StateId = StateId(u32::MAX);
    /// The terminal state: no output, no options, no way out.
    pub const FINISHED: StateId = StateId(u32::MAX - 1);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_sentinel(self) -> bool {
        self == Self::NOT_STARTED || self == Self::FINISHED
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            StateId::NOT_STARTED => write!(f, "not-started"),
            StateId::FINISHED => write!(f, "finished"),
            StateId(n) => write!(f, "{}", n),
        }
    }
}

/// A fully materialized output or option payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OutputValue {
    Text(String),
    Number(i64),
    Flag(bool),
    EnumMember {
        enum_name: String,
        member: String,
    },
    Record {
        record: String,
        fields: Vec<(String, OutputValue)>,
    },
    Invoke {
        reference: String,
        method: String,
        arguments: Vec<OutputValue>,
    },
}

/// Where a state goes next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transition {
    /// Single unconditional successor.
    Continue(StateId),
    /// Successor array indexed by the chosen option.
    ByOption(Vec<StateId>),
    /// Successor array indexed by the register's current value.
    ByRegister {
        register: RegisterId,
        targets: Vec<StateId>,
    },
}

/// The side effect of passing through a state: write `value` into
/// `register`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterWrite {
    pub register: RegisterId,
    pub value: u32,
}

/// One row of the three per-scene tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoweredState {
    pub id: StateId,
    /// The output table entry: absent for pure-control states.
    pub output: Option<OutputValue>,
    /// The options table entry: empty for non-branching states.
    pub options: Vec<OutputValue>,
    pub effect: Option<RegisterWrite>,
    pub transition: Transition,
}

/// One scene's flat state table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoweredScene {
    pub name: String,
    pub is_chapter: bool,
    pub start: StateId,
    /// States in canonical order; `states[i].id == StateId(i)`.
    pub states: Vec<LoweredState>,
}

/// One slice of a spectrum's unit-interval partition, as exact
/// rationals for the emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalInfo {
    pub option: u32,
    pub numerator: u64,
    pub denominator: u64,
    pub inclusive: bool,
}

/// One hidden register of the generated machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterInfo {
    pub name: String,
    pub options: Vec<String>,
    /// Public registers are host-inspectable by name.
    pub public: bool,
    /// Initial value, when the outcome declares a default option.
    pub default: Option<u32>,
    /// Present for spectrums: the partition the host samples against.
    pub intervals: Option<Vec<IntervalInfo>>,
}

/// Everything the lowering stage hands to the emitter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoweredProgram {
    pub scenes: Vec<LoweredScene>,
    pub registers: Vec<RegisterInfo>,
}

impl LoweredProgram {
    pub fn scene(&self, name: &str) -> Option<&LoweredScene> {
        self.scenes.iter().find(|s| s.name == name)
    }

    /// The story's entry points, in declaration order.
    pub fn chapters(&self) -> impl Iterator<Item = &LoweredScene> {
        self.scenes.iter().filter(|s| s.is_chapter)
    }
}
