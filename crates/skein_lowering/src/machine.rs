//! The reference executor of a lowered scene.
//!
//! The generated artifact exposes exactly this object's behavior; the
//! emitter transcribes the tables, and this machine is what the tests
//! step. One transition call runs to the next observable state: continue
//! states, register writes, and register-dispatched branches are passed
//! through silently.

use crate::tables::*;

/// A single story traversal. Single-threaded, synchronous; one
/// `try_continue*` call completes before the next begins.
#[derive(Debug, Clone)]
pub struct StoryMachine<'a> {
    program: &'a LoweredProgram,
    scene: &'a LoweredScene,
    current: StateId,
    registers: Vec<u32>,
    finished: bool,
}

impl<'a> StoryMachine<'a> {
    /// Start a traversal of the named scene. `None` if the program has
    /// no such scene.
    pub fn new(program: &'a LoweredProgram, scene: &str) -> Option<Self> {
        let scene = program.scene(scene)?;
        let registers = program
            .registers
            .iter()
            .map(|r| r.default.unwrap_or(0))
            .collect();
        Some(Self {
            program,
            scene,
            current: StateId::NOT_STARTED,
            registers,
            finished: false,
        })
    }

    /// True until the first successful step.
    pub fn not_started(&self) -> bool {
        self.current == StateId::NOT_STARTED
    }

    /// True once the terminal state was reached; permanent.
    pub fn finished_story(&self) -> bool {
        self.finished
    }

    /// The current state's output, or `None` before the first step and
    /// at the terminal state.
    pub fn current_output(&self) -> Option<&OutputValue> {
        if self.current.is_sentinel() {
            return None;
        }
        self.state(self.current).output.as_ref()
    }

    /// The options pending at the current state; empty unless stepping
    /// requires a choice.
    pub fn current_options(&self) -> &[OutputValue] {
        if self.current.is_sentinel() {
            return &[];
        }
        &self.state(self.current).options
    }

    /// The currently assigned option of a public outcome, by name.
    pub fn outcome_value(&self, name: &str) -> Option<&str> {
        let (index, info) = self
            .program
            .registers
            .iter()
            .enumerate()
            .find(|(_, r)| r.public && r.name == name)?;
        info.options
            .get(self.registers[index] as usize)
            .map(String::as_str)
    }

    /// Take one step. Fails without state change when options are
    /// pending or the story is finished.
    pub fn try_continue(&mut self) -> bool {
        if self.finished || !self.current_options().is_empty() {
            return false;
        }
        let next = if self.not_started() {
            self.scene.start
        } else {
            match &self.state(self.current).transition {
                Transition::Continue(next) => *next,
                Transition::ByRegister { register, targets } => {
                    self.dispatch(*register, targets)
                }
                Transition::ByOption(_) => {
                    panic!("internal invariant violated: option transition without options")
                }
            }
        };
        self.advance_from(next);
        true
    }

    /// Take one step through the chosen option. Fails without state
    /// change when no options are pending, the index is out of range,
    /// or the story is finished.
    pub fn try_continue_with_option(&mut self, option: usize) -> bool {
        if self.finished || option >= self.current_options().len() {
            return false;
        }
        let next = match &self.state(self.current).transition {
            Transition::ByOption(targets) => targets[option],
            _ => panic!("internal invariant violated: options without an option transition"),
        };
        self.advance_from(next);
        true
    }

    /// Step repeatedly until an observable state (output or options) or
    /// the terminal sentinel.
    fn advance_from(&mut self, mut next: StateId) {
        loop {
            if next == StateId::FINISHED {
                self.current = StateId::FINISHED;
                self.finished = true;
                return;
            }
            let effect = self.state(next).effect;
            if let Some(write) = effect {
                self.registers[write.register.index()] = write.value;
            }
            let state = self.state(next);
            if state.output.is_some() || !state.options.is_empty() {
                self.current = next;
                return;
            }
            next = match &state.transition {
                Transition::Continue(next) => *next,
                Transition::ByRegister { register, targets } => self.dispatch(*register, targets),
                Transition::ByOption(_) => {
                    panic!("internal invariant violated: option transition without options")
                }
            };
        }
    }

    fn dispatch(&self, register: skein_flow::RegisterId, targets: &[StateId]) -> StateId {
        let value = self.registers[register.index()] as usize;
        *targets.get(value).unwrap_or_else(|| {
            panic!("internal invariant violated: register value {value} out of branch range")
        })
    }

    fn state(&self, id: StateId) -> &LoweredState {
        let state = self.scene.states.get(id.index()).unwrap_or_else(|| {
            panic!("internal invariant violated: state {id} was never assigned")
        });
        debug_assert_eq!(state.id, id);
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skein_flow::RegisterId;

    fn text(s: &str) -> OutputValue {
        OutputValue::Text(s.to_string())
    }

    /// Hand-assembled two-state scene: output then finish.
    fn tiny_program() -> LoweredProgram {
        LoweredProgram {
            scenes: vec![LoweredScene {
                name: "intro".to_string(),
                is_chapter: true,
                start: StateId(0),
                states: vec![
                    LoweredState {
                        id: StateId(0),
                        output: Some(text("hello")),
                        options: Vec::new(),
                        effect: None,
                        transition: Transition::Continue(StateId(1)),
                    },
                    LoweredState {
                        id: StateId(1),
                        output: Some(text("goodbye")),
                        options: Vec::new(),
                        effect: None,
                        transition: Transition::Continue(StateId::FINISHED),
                    },
                ],
            }],
            registers: Vec::new(),
        }
    }

    #[test]
    fn test_linear_walk() {
        let program = tiny_program();
        let mut machine = StoryMachine::new(&program, "intro").unwrap();
        assert!(machine.not_started());
        assert_eq!(machine.current_output(), None);

        assert!(machine.try_continue());
        assert!(!machine.not_started());
        assert_eq!(machine.current_output(), Some(&text("hello")));

        assert!(machine.try_continue());
        assert_eq!(machine.current_output(), Some(&text("goodbye")));

        assert!(machine.try_continue());
        assert!(machine.finished_story());
        assert_eq!(machine.current_output(), None);
        assert!(!machine.try_continue());
        assert!(!machine.try_continue_with_option(0));
    }

    #[test]
    fn test_register_write_is_silent() {
        let program = LoweredProgram {
            scenes: vec![LoweredScene {
                name: "intro".to_string(),
                is_chapter: true,
                start: StateId(0),
                states: vec![
                    LoweredState {
                        id: StateId(0),
                        output: None,
                        options: Vec::new(),
                        effect: Some(RegisterWrite {
                            register: RegisterId(0),
                            value: 1,
                        }),
                        transition: Transition::Continue(StateId(1)),
                    },
                    LoweredState {
                        id: StateId(1),
                        output: None,
                        options: Vec::new(),
                        effect: None,
                        transition: Transition::ByRegister {
                            register: RegisterId(0),
                            targets: vec![StateId(2), StateId(3)],
                        },
                    },
                    LoweredState {
                        id: StateId(2),
                        output: Some(text("zero")),
                        options: Vec::new(),
                        effect: None,
                        transition: Transition::Continue(StateId::FINISHED),
                    },
                    LoweredState {
                        id: StateId(3),
                        output: Some(text("one")),
                        options: Vec::new(),
                        effect: None,
                        transition: Transition::Continue(StateId::FINISHED),
                    },
                ],
            }],
            registers: vec![RegisterInfo {
                name: "mood".to_string(),
                options: vec!["calm".to_string(), "stormy".to_string()],
                public: true,
                default: None,
                intervals: None,
            }],
        };
        let mut machine = StoryMachine::new(&program, "intro").unwrap();
        // One step passes through the write and the branch silently.
        assert!(machine.try_continue());
        assert_eq!(machine.current_output(), Some(&text("one")));
        assert_eq!(machine.outcome_value("mood"), Some("stormy"));
    }
}
