//! Binder integration tests.
//!
//! Build trees with the node builder, bind them, and verify symbol
//! creation plus every diagnostic the binder can raise.

use skein_ast::node::{TypeName, Visibility};
use skein_ast::types::OutcomeFlags;
use skein_binder::{BindResult, Binder, SymbolKind};
use skein_nodebuilder::StoryBuilder;

fn bind(builder: StoryBuilder) -> BindResult {
    let (module, interner) = builder.finish();
    Binder::new(interner).bind_module(&module)
}

fn codes(result: &BindResult) -> Vec<u32> {
    result
        .diagnostics
        .diagnostics()
        .iter()
        .map(|d| d.code)
        .collect()
}

// ============================================================================
// Symbol creation and name resolution
// ============================================================================

#[test]
fn test_bind_empty_module() {
    let result = bind(StoryBuilder::new());
    assert!(result.diagnostics.is_empty());
    assert!(result.symbols.is_empty());
    assert!(result.module.scenes.is_empty());
}

#[test]
fn test_bind_declarations_in_order() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "stormy"]);
    b.chapter("intro", vec![]);
    b.scene("finale", vec![]);
    let result = bind(b);

    assert!(result.diagnostics.is_empty());
    assert_eq!(result.symbols.len(), 3);
    // Declaration order is the id order.
    assert!(matches!(result.symbols.symbols()[0].kind, SymbolKind::Outcome(_)));
    assert!(matches!(result.symbols.symbols()[1].kind, SymbolKind::Scene(_)));
    assert_eq!(result.module.scenes.len(), 2);
}

#[test]
fn test_forward_reference_between_scenes() {
    let b = StoryBuilder::new();
    let run = b.run("finale");
    b.chapter("intro", vec![run]);
    let line = b.text("the end");
    let show = b.show(line);
    b.scene("finale", vec![show]);
    let result = bind(b);

    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
    assert_eq!(result.module.scenes[0].runs.len(), 1);
}

#[test]
fn test_duplicate_declaration() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm"]);
    b.scene("mood", vec![]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2001]);
    // The first declaration keeps the name.
    assert!(matches!(result.symbols.symbols()[0].kind, SymbolKind::Outcome(_)));
}

#[test]
fn test_cannot_find_name_reported_once() {
    let b = StoryBuilder::new();
    let first = b.run("nowhere");
    let second = b.run("nowhere");
    b.chapter("intro", vec![first, second]);
    let result = bind(b);
    // The second use of the same unresolved name stays silent.
    assert_eq!(codes(&result), vec![2002]);
}

#[test]
fn test_run_target_must_be_a_scene() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm"]);
    let run = b.run("mood");
    b.chapter("intro", vec![run]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2003]);
}

#[test]
fn test_branch_target_must_be_an_outcome() {
    let b = StoryBuilder::new();
    b.scene("helper", vec![]);
    let arm = b.arm(&["calm"], vec![]);
    let branch = b.branch("helper", vec![arm]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2004]);
}

#[test]
fn test_scene_recursion_is_rejected() {
    let b = StoryBuilder::new();
    let to_b = b.run("second");
    b.chapter("first", vec![to_b]);
    let back = b.run("first");
    b.scene("second", vec![back]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2010, 2010]);
}

#[test]
fn test_direct_self_run_is_rejected() {
    let b = StoryBuilder::new();
    let again = b.run("loop");
    b.chapter("loop", vec![again]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2010]);
}

// ============================================================================
// Outcome validation
// ============================================================================

#[test]
fn test_duplicate_option() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "calm"]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2101]);
}

#[test]
fn test_unknown_default_option() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy"], "serene");
    let result = bind(b);
    assert_eq!(codes(&result), vec![2102]);
}

#[test]
fn test_assignment_target_option_must_be_declared() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "stormy"]);
    let set = b.set("mood", "serene");
    b.chapter("intro", vec![set]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2103]);
}

#[test]
fn test_branch_option_must_be_declared() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy"], "calm");
    let bad = b.arm(&["serene"], vec![]);
    let rest = b.other(vec![]);
    let branch = b.branch("mood", vec![bad, rest]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2104]);
}

#[test]
fn test_duplicate_branch_option() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy"], "calm");
    let first = b.arm(&["calm"], vec![]);
    let second = b.arm(&["calm", "stormy"], vec![]);
    let branch = b.branch("mood", vec![first, second]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2105]);
}

#[test]
fn test_branch_must_cover_every_option_or_fall_back() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy", "wistful"], "calm");
    let only = b.arm(&["calm"], vec![]);
    let branch = b.branch("mood", vec![only]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2106]);
    let text = &result.diagnostics.diagnostics()[0].message_text;
    assert!(text.contains("'stormy'") && text.contains("'wistful'"), "{text}");
}

#[test]
fn test_other_branch_with_full_coverage_is_unreachable() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy"], "calm");
    let both = b.arm(&["calm", "stormy"], vec![]);
    let other = b.other(vec![]);
    let branch = b.branch("mood", vec![both, other]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2107]);
}

#[test]
fn test_at_most_one_other_branch() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy"], "calm");
    let arm = b.arm(&["calm"], vec![]);
    let first_other = b.other(vec![]);
    let second_other = b.other(vec![]);
    let branch = b.branch("mood", vec![arm, first_other, second_other]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2108]);
}

#[test]
fn test_outcome_without_options() {
    let b = StoryBuilder::new();
    b.outcome("mood", &[]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2110]);
}

#[test]
fn test_branch_dispatch_maps_options_to_arms() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy", "wistful"], "calm");
    let calm = b.arm(&["calm"], vec![]);
    let rest = b.other(vec![]);
    let branch = b.branch("mood", vec![calm, rest]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);

    assert!(result.diagnostics.is_empty());
    let skein_binder::BoundStatement::BranchOn(branch) = &result.module.scenes[0].body[0] else {
        panic!("expected a bound branch-on");
    };
    assert_eq!(branch.dispatch, vec![0, 1, 1]);
}

// ============================================================================
// Definite assignment
// ============================================================================

#[test]
fn test_branch_on_unassigned_outcome_without_default() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "stormy"]);
    let arm = b.arm(&["calm", "stormy"], vec![]);
    let branch = b.branch("mood", vec![arm]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2109]);
}

#[test]
fn test_assignment_in_every_switch_arm_dominates_the_read() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "stormy"]);
    let set_calm = b.set("mood", "calm");
    let set_stormy = b.set("mood", "stormy");
    let label_a = b.text("smile");
    let label_b = b.text("scowl");
    let switch = b.switch(vec![(label_a, vec![set_calm]), (label_b, vec![set_stormy])]);
    let arm = b.arm(&["calm", "stormy"], vec![]);
    let branch = b.branch("mood", vec![arm]);
    b.chapter("intro", vec![switch, branch]);
    let result = bind(b);

    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
    let mood = result.symbols.outcomes().next().unwrap();
    let outcome = mood.as_outcome().unwrap();
    assert!(outcome.flags.contains(OutcomeFlags::ALWAYS_ASSIGNED));
}

#[test]
fn test_assignment_in_only_one_arm_does_not_dominate() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "stormy"]);
    let set_calm = b.set("mood", "calm");
    let label_a = b.text("smile");
    let label_b = b.text("scowl");
    let switch = b.switch(vec![(label_a, vec![set_calm]), (label_b, vec![])]);
    let arm = b.arm(&["calm", "stormy"], vec![]);
    let branch = b.branch("mood", vec![arm]);
    b.chapter("intro", vec![switch, branch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2109]);
}

#[test]
fn test_default_option_stands_in_for_assignment() {
    let b = StoryBuilder::new();
    b.outcome_with_default("mood", &["calm", "stormy"], "stormy");
    let arm = b.arm(&["calm", "stormy"], vec![]);
    let branch = b.branch("mood", vec![arm]);
    b.chapter("intro", vec![branch]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
}

#[test]
fn test_run_carries_callee_assignments() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "stormy"]);
    let set = b.set("mood", "calm");
    b.scene("prepare", vec![set]);
    let run = b.run("prepare");
    let arm = b.arm(&["calm", "stormy"], vec![]);
    let branch = b.branch("mood", vec![arm]);
    b.chapter("intro", vec![run, branch]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
}

// ============================================================================
// Spectrum validation
// ============================================================================

#[test]
fn test_spectrum_partition_must_reach_one() {
    let b = StoryBuilder::new();
    b.spectrum("fate", &[("doom", 1, 4), ("luck", 1, 4)]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2202]);
    let text = &result.diagnostics.diagnostics()[0].message_text;
    assert!(text.contains("1/2"), "{text}");
}

#[test]
fn test_spectrum_partition_must_not_exceed_one() {
    let b = StoryBuilder::new();
    b.spectrum("fate", &[("doom", 3, 4), ("luck", 1, 2)]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2203]);
}

#[test]
fn test_spectrum_interval_must_have_width() {
    let b = StoryBuilder::new();
    b.spectrum("fate", &[("doom", 0, 4), ("luck", 1, 1)]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2201]);
}

#[test]
fn test_spectrum_weight_denominator_must_not_be_zero() {
    let b = StoryBuilder::new();
    b.spectrum("fate", &[("doom", 1, 0), ("luck", 1, 1)]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2204]);
}

#[test]
fn test_valid_spectrum_intervals() {
    let b = StoryBuilder::new();
    b.spectrum("fate", &[("doom", 1, 4), ("luck", 1, 4), ("grace", 1, 2)]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));

    let fate = result.symbols.outcomes().next().unwrap();
    let outcome = fate.as_outcome().unwrap();
    assert!(outcome.is_spectrum());
    let intervals = outcome.intervals.as_ref().unwrap();
    assert_eq!(intervals.len(), 3);
    // Strictly increasing cumulative bounds, closed exactly at 1.
    assert_eq!(intervals[0].upper.to_string(), "1/4");
    assert_eq!(intervals[1].upper.to_string(), "1/2");
    assert_eq!(intervals[2].upper.to_string(), "1");
    assert!(!intervals[0].inclusive);
    assert!(!intervals[1].inclusive);
    assert!(intervals[2].inclusive);
}

// ============================================================================
// Record typing
// ============================================================================

fn stage_record(b: &StoryBuilder) {
    b.record(
        "Line",
        vec![("speaker", TypeName::Text), ("volume", TypeName::Number)],
    );
}

#[test]
fn test_record_creation_positional_and_named() {
    let b = StoryBuilder::new();
    stage_record(&b);
    let speaker = b.text("narrator");
    let volume = b.number(3);
    let speaker_arg = b.arg(speaker);
    let volume_arg = b.named_arg("volume", volume);
    let line = b.create("Line", vec![speaker_arg, volume_arg]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
}

#[test]
fn test_unknown_property() {
    let b = StoryBuilder::new();
    stage_record(&b);
    let value = b.number(3);
    let bad = b.named_arg("pitch", value);
    let speaker = b.text("narrator");
    let volume = b.number(1);
    let a1 = b.arg(speaker);
    let a2 = b.arg(volume);
    let line = b.create("Line", vec![a1, a2, bad]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2301]);
}

#[test]
fn test_property_given_twice() {
    let b = StoryBuilder::new();
    stage_record(&b);
    let speaker = b.text("narrator");
    let volume = b.number(1);
    let again = b.number(2);
    let a1 = b.arg(speaker);
    let a2 = b.named_arg("volume", volume);
    let a3 = b.named_arg("volume", again);
    let line = b.create("Line", vec![a1, a2, a3]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2302]);
}

#[test]
fn test_positional_after_named() {
    let b = StoryBuilder::new();
    stage_record(&b);
    let speaker = b.text("narrator");
    let volume = b.number(1);
    let a1 = b.named_arg("speaker", speaker);
    let a2 = b.arg(volume);
    let line = b.create("Line", vec![a1, a2]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    // The skipped positional also leaves 'volume' without an argument.
    assert_eq!(codes(&result), vec![2303, 2305]);
}

#[test]
fn test_too_many_arguments() {
    let b = StoryBuilder::new();
    stage_record(&b);
    let speaker = b.text("narrator");
    let volume = b.number(1);
    let extra = b.number(2);
    let a1 = b.arg(speaker);
    let a2 = b.arg(volume);
    let a3 = b.arg(extra);
    let line = b.create("Line", vec![a1, a2, a3]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2304]);
}

#[test]
fn test_missing_argument() {
    let b = StoryBuilder::new();
    stage_record(&b);
    let speaker = b.text("narrator");
    let a1 = b.arg(speaker);
    let line = b.create("Line", vec![a1]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2305]);
}

#[test]
fn test_argument_type_mismatch() {
    let b = StoryBuilder::new();
    stage_record(&b);
    let speaker = b.number(7);
    let volume = b.number(1);
    let a1 = b.arg(speaker);
    let a2 = b.arg(volume);
    let line = b.create("Line", vec![a1, a2]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2306]);
    let text = &result.diagnostics.diagnostics()[0].message_text;
    assert!(text.contains("'speaker'") && text.contains("text") && text.contains("number"), "{text}");
}

#[test]
fn test_record_typed_property_accepts_matching_record() {
    let b = StoryBuilder::new();
    b.record("Voice", vec![("tone", TypeName::Text)]);
    let voice_type = b.named_type("Voice");
    b.record("Line", vec![("voice", voice_type)]);
    let tone = b.text("soft");
    let tone_arg = b.arg(tone);
    let voice = b.create("Voice", vec![tone_arg]);
    let voice_arg = b.arg(voice);
    let line = b.create("Line", vec![voice_arg]);
    let show = b.show(line);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
}

#[test]
fn test_scene_is_not_a_type() {
    let b = StoryBuilder::new();
    b.scene("helper", vec![]);
    let helper_type = b.named_type("helper");
    b.record("Line", vec![("voice", helper_type)]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2011]);
}

// ============================================================================
// Enums
// ============================================================================

#[test]
fn test_enum_member_resolution() {
    let b = StoryBuilder::new();
    b.enumeration("Weather", &["rain", "sun"]);
    let member = b.enum_member("Weather", "rain");
    let show = b.show(member);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_unknown_enum_member() {
    let b = StoryBuilder::new();
    b.enumeration("Weather", &["rain", "sun"]);
    let member = b.enum_member("Weather", "snow");
    let show = b.show(member);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2312]);
}

#[test]
fn test_duplicate_enum_member() {
    let b = StoryBuilder::new();
    b.enumeration("Weather", &["rain", "rain"]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2008]);
}

// ============================================================================
// Interfaces and references
// ============================================================================

fn stage_interface(b: &StoryBuilder) {
    let play = b.action("play", vec![TypeName::Text]);
    let offer = b.choice_method("offer", vec![TypeName::Text]);
    b.interface("Stage", vec![play, offer]);
    b.reference("stage", "Stage");
}

#[test]
fn test_action_invocation_in_output() {
    let b = StoryBuilder::new();
    stage_interface(&b);
    let cue = b.text("thunder");
    let invoke = b.invoke("stage", "play", vec![cue]);
    let show = b.show(invoke);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
}

#[test]
fn test_choice_invocation_as_switch_label() {
    let b = StoryBuilder::new();
    stage_interface(&b);
    let prompt = b.text("stay?");
    let label = b.invoke("stage", "offer", vec![prompt]);
    let switch = b.switch(vec![(label, vec![])]);
    b.chapter("intro", vec![switch]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty(), "got {:?}", codes(&result));
}

#[test]
fn test_unknown_method() {
    let b = StoryBuilder::new();
    stage_interface(&b);
    let invoke = b.invoke("stage", "vanish", vec![]);
    let show = b.show(invoke);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2307]);
}

#[test]
fn test_method_argument_count() {
    let b = StoryBuilder::new();
    stage_interface(&b);
    let invoke = b.invoke("stage", "play", vec![]);
    let show = b.show(invoke);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2308]);
}

#[test]
fn test_method_argument_type() {
    let b = StoryBuilder::new();
    stage_interface(&b);
    let arg = b.number(9);
    let invoke = b.invoke("stage", "play", vec![arg]);
    let show = b.show(invoke);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2309]);
}

#[test]
fn test_choice_method_outside_switch_label() {
    let b = StoryBuilder::new();
    stage_interface(&b);
    let prompt = b.text("stay?");
    let invoke = b.invoke("stage", "offer", vec![prompt]);
    let show = b.show(invoke);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2310]);
}

#[test]
fn test_action_method_as_switch_label() {
    let b = StoryBuilder::new();
    stage_interface(&b);
    let cue = b.text("thunder");
    let label = b.invoke("stage", "play", vec![cue]);
    let switch = b.switch(vec![(label, vec![])]);
    b.chapter("intro", vec![switch]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2311]);
}

#[test]
fn test_reference_must_name_an_interface() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm"]);
    b.reference("stage", "mood");
    let result = bind(b);
    assert_eq!(codes(&result), vec![2006]);
}

#[test]
fn test_duplicate_interface_method() {
    let b = StoryBuilder::new();
    let first = b.action("play", vec![]);
    let second = b.action("play", vec![TypeName::Text]);
    b.interface("Stage", vec![first, second]);
    let result = bind(b);
    assert_eq!(codes(&result), vec![2008]);
}

// ============================================================================
// Error recovery
// ============================================================================

#[test]
fn test_binding_reports_every_independent_problem() {
    let b = StoryBuilder::new();
    b.outcome("mood", &["calm", "calm"]);
    let set = b.set("mood", "serene");
    let run = b.run("nowhere");
    b.chapter("intro", vec![set, run]);
    let result = bind(b);
    // One compilation run, three independent problems.
    assert_eq!(codes(&result).len(), 3);
    assert!(codes(&result).contains(&2101));
    assert!(codes(&result).contains(&2103));
    assert!(codes(&result).contains(&2002));
}

#[test]
fn test_missing_statements_are_skipped_silently() {
    let b = StoryBuilder::new();
    let missing = b.missing_statement();
    let line = b.text("still here");
    let show = b.show(line);
    b.chapter("intro", vec![missing, show]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty());
    // The missing statement contributed nothing to the bound body.
    assert_eq!(result.module.scenes[0].body.len(), 1);
}

#[test]
fn test_missing_expression_binds_to_error_placeholder() {
    let b = StoryBuilder::new();
    let missing = b.missing_expression();
    let show = b.show(missing);
    b.chapter("intro", vec![show]);
    let result = bind(b);
    assert!(result.diagnostics.is_empty());
    let skein_binder::BoundStatement::Output(output) = &result.module.scenes[0].body[0] else {
        panic!("expected output statement");
    };
    assert_eq!(output.expression, skein_binder::BoundExpression::Error);
}

#[test]
fn test_public_visibility_lands_on_flags() {
    let b = StoryBuilder::new();
    b.public_outcome("mood", &["calm", "stormy"]);
    b.outcome_full("secret", &["yes", "no"], None, Visibility::Private);
    let result = bind(b);
    let flags: Vec<OutcomeFlags> = result
        .symbols
        .outcomes()
        .map(|s| s.as_outcome().unwrap().flags)
        .collect();
    assert!(flags[0].contains(OutcomeFlags::PUBLIC));
    assert!(!flags[1].contains(OutcomeFlags::PUBLIC));
}
