//! End-to-end runs of the change-PIN machine, one user story per test.

use pinflow::core::State;
use pinflow::eid::EidInteractionError;
use pinflow::flow::{
    ChangePinEvent, ChangePinState, ChangePinStateMachine, FlowContext, Pin, PinChangeFlags,
};

fn transport_context() -> FlowContext {
    FlowContext::new(
        PinChangeFlags::new(false, true),
        Pin::new("12345"),
        Pin::new("123456"),
    )
}

#[test]
fn transport_pin_setup_happy_path() {
    let mut machine = ChangePinStateMachine::new();

    machine
        .transition(ChangePinEvent::StartPinChange {
            identification_pending: false,
            transport_pin: true,
        })
        .unwrap();
    machine
        .transition(ChangePinEvent::EnterOldPin(Pin::new("12345")))
        .unwrap();
    machine.transition(ChangePinEvent::ConfirmNewPinIntro).unwrap();
    machine
        .transition(ChangePinEvent::EnterNewPin(Pin::new("123456")))
        .unwrap();
    machine
        .transition(ChangePinEvent::ConfirmNewPin(Pin::new("123456")))
        .unwrap();
    machine.transition(ChangePinEvent::FrameworkRequestsPin).unwrap();

    let early_finish = machine.transition(ChangePinEvent::Finish);
    assert!(early_finish.unwrap_err().is_illegal_transition());
    assert_eq!(
        machine.current_state(),
        &ChangePinState::FrameworkReadyForPinInput(transport_context())
    );

    machine
        .transition(ChangePinEvent::FrameworkRequestsNewPin)
        .unwrap();
    let state = machine.transition(ChangePinEvent::Finish).unwrap();

    assert_eq!(state, ChangePinState::Finished);
    assert!(machine.is_final());
    assert_eq!(
        machine.history().get_path(),
        vec![
            "Invalid",
            "OldPinInput",
            "NewPinIntro",
            "NewPinInput",
            "NewPinConfirmation",
            "StartCardInteraction",
            "FrameworkReadyForPinInput",
            "FrameworkReadyForNewPinInput",
            "Finished",
        ]
    );
}

#[test]
fn can_escalation_keeps_secrets() {
    let mut machine =
        ChangePinStateMachine::with_state(ChangePinState::StartCardInteraction(transport_context()));

    let state = machine.transition(ChangePinEvent::FrameworkRequestsCan).unwrap();
    assert_eq!(
        state,
        ChangePinState::CanRequested {
            context: transport_context(),
            short_flow: true,
        }
    );

    // CAN goes to the card outside the machine; the card then asks for the PIN.
    let state = machine.transition(ChangePinEvent::FrameworkRequestsPin).unwrap();

    assert_eq!(
        state,
        ChangePinState::FrameworkReadyForPinInput(transport_context())
    );
}

#[test]
fn can_after_subsequent_scan_is_long_flow() {
    let mut machine =
        ChangePinStateMachine::with_state(ChangePinState::ReadyForSubsequentScan(transport_context()));

    let state = machine.transition(ChangePinEvent::FrameworkRequestsCan).unwrap();

    assert!(matches!(
        state,
        ChangePinState::CanRequested {
            short_flow: false,
            ..
        }
    ));
}

#[test]
fn recoverable_process_failure_loops() {
    let mut machine =
        ChangePinStateMachine::with_state(ChangePinState::StartCardInteraction(transport_context()));
    let failure = EidInteractionError::ProcessFailed {
        redirect_url: None,
        result_minor: Some("cardRemoved".to_string()),
        result_reason: None,
    };

    for _ in 0..3 {
        let state = machine
            .transition(ChangePinEvent::Error(failure.clone()))
            .unwrap();
        assert_eq!(
            state,
            ChangePinState::ProcessFailed {
                context: transport_context(),
                first_scan: true,
            }
        );
        assert!(state.is_error());
        assert!(!state.is_final());

        let state = machine.transition(ChangePinEvent::ProceedAfterError).unwrap();
        assert_eq!(
            state,
            ChangePinState::StartCardInteraction(transport_context())
        );
    }
}

#[test]
fn failure_after_subsequent_scan_cancels() {
    let mut machine =
        ChangePinStateMachine::with_state(ChangePinState::ReadyForSubsequentScan(transport_context()));

    machine
        .transition(ChangePinEvent::Error(EidInteractionError::ProcessFailed {
            redirect_url: None,
            result_minor: None,
            result_reason: None,
        }))
        .unwrap();
    let state = machine.transition(ChangePinEvent::ProceedAfterError).unwrap();

    assert_eq!(state, ChangePinState::Cancelled);
}

#[test]
fn wrong_old_pin_is_reentered_without_new_pin() {
    let mut machine = ChangePinStateMachine::with_state(
        ChangePinState::FrameworkReadyForPinInput(transport_context()),
    );

    let state = machine.transition(ChangePinEvent::FrameworkRequestsPin).unwrap();
    assert_eq!(
        state,
        ChangePinState::OldPinRetry {
            flags: PinChangeFlags::new(false, true),
            new_pin: Pin::new("123456"),
        }
    );

    machine
        .transition(ChangePinEvent::EnterOldPin(Pin::new("54321")))
        .unwrap();
    machine.transition(ChangePinEvent::FrameworkRequestsPin).unwrap();
    let state = machine
        .transition(ChangePinEvent::FrameworkRequestsNewPin)
        .unwrap();

    assert_eq!(
        state.context().map(|context| &context.old_pin),
        Some(&Pin::new("54321"))
    );
    assert_eq!(state.new_pin(), Some(&Pin::new("123456")));
}

#[test]
fn card_errors_map_to_terminal_states() {
    let cases = [
        (EidInteractionError::CardDeactivated, ChangePinState::CardDeactivated),
        (EidInteractionError::CardBlocked, ChangePinState::CardBlocked),
        (EidInteractionError::ChangingPinFailed, ChangePinState::UnknownError),
        (EidInteractionError::UnknownReader, ChangePinState::UnknownError),
        (
            EidInteractionError::framework("boom"),
            ChangePinState::UnknownError,
        ),
    ];

    for (error, expected) in cases {
        let mut machine =
            ChangePinStateMachine::with_state(ChangePinState::StartCardInteraction(transport_context()));
        let state = machine.transition(ChangePinEvent::Error(error)).unwrap();

        assert_eq!(state, expected);
        assert!(state.is_final());
        assert!(state.is_error());
    }
}

#[test]
fn back_walks_to_invalid() {
    let mut machine = ChangePinStateMachine::with_state(ChangePinState::NewPinConfirmation(
        transport_context(),
    ));

    let mut names = Vec::new();
    while *machine.current_state() != ChangePinState::Invalid {
        let state = machine.transition(ChangePinEvent::Back).unwrap();
        names.push(state.name().to_string());
    }

    assert_eq!(
        names,
        vec!["NewPinInput", "NewPinIntro", "OldPinInput", "Invalid"]
    );
}

#[tokio::test]
async fn subscribers_see_latest_snapshot() {
    let mut machine = ChangePinStateMachine::new();
    let mut updates = machine.subscribe();

    machine
        .transition(ChangePinEvent::start(PinChangeFlags::new(true, false)))
        .unwrap();

    updates.changed().await.unwrap();
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(
        snapshot.state,
        ChangePinState::OldPinInput(PinChangeFlags::new(true, false))
    );
    assert!(matches!(snapshot.event, ChangePinEvent::StartPinChange { .. }));
    assert!(machine.session_id().is_some());

    machine.transition(ChangePinEvent::Invalidate).unwrap();
    assert!(machine.session_id().is_none());
}
