// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use super::*;

#[test]
fn parses_keyword_binding() {
    let binding: Binding = "./scripts=own".parse().unwrap();
    assert_eq!(binding.root, PathBuf::from("./scripts"));
    assert_eq!(binding.selector, ServerSelector::Owned);
}

#[test]
fn parses_explicit_server_list_binding() {
    let binding: Binding = "/tmp/mirror=home,pserv-0".parse().unwrap();
    assert_eq!(
        binding.selector,
        ServerSelector::Explicit(vec!["home".to_string(), "pserv-0".to_string()])
    );
}

#[test]
fn rejects_binding_without_separator() {
    assert!("./scripts".parse::<Binding>().is_err());
}

#[test]
fn rejects_binding_with_empty_directory() {
    assert!("=all".parse::<Binding>().is_err());
}

#[test]
fn rejects_binding_with_empty_selector() {
    assert!("./scripts=".parse::<Binding>().is_err());
}

#[test]
fn collects_multiple_bindings() {
    let specs = vec!["./a=all".to_string(), "./b=other".to_string()];
    let bindings = parse_bindings(&specs).unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(bindings[1].selector, ServerSelector::NotOwned);
}

#[test]
fn one_bad_binding_fails_the_whole_set() {
    let specs = vec!["./a=all".to_string(), "broken".to_string()];
    assert!(parse_bindings(&specs).is_err());
}

#[test]
fn connected_event_triggers_a_rebuild() {
    assert_eq!(classify_event(Ok(())), ConnectionEvent::Rebuild);
}

#[test]
fn lagged_receiver_keeps_the_daemon_running() {
    assert_eq!(
        classify_event(Err(RecvError::Lagged(3))),
        ConnectionEvent::Skip
    );
}

#[test]
fn closed_channel_shuts_the_daemon_down() {
    assert_eq!(
        classify_event(Err(RecvError::Closed)),
        ConnectionEvent::Shutdown
    );
}
