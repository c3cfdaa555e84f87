//! Integration tests for the sync controller against an in-memory server.

use chatsync_engine::{Endpoint, FetchOutcome, SyncConfig};
use chatsync_protocol::ChatStatus;
use chatsync_testkit::prelude::*;
use std::time::Duration;

const TICK: Duration = Duration::from_millis(1);

fn two_chats() -> Vec<chatsync_protocol::Chat> {
    vec![
        ChatBuilder::new(1)
            .name("Ana")
            .messages(vec![message(1, 100, "a1", "oi", 10)])
            .build(),
        ChatBuilder::new(2)
            .name("Bruno")
            .messages(vec![message(2, 200, "b1", "bom dia", 20)])
            .build(),
    ]
}

#[tokio::test]
async fn list_fetch_orders_by_recent_activity() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let ids: Vec<_> = harness.controller.chats().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert!(harness.notifier.notifications().is_empty());
}

#[tokio::test]
async fn optimistic_send_reconciles_to_single_message() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;

    assert!(controller.send(1, "  Olá  ", true).await);

    let chat = controller.chat(1).unwrap();
    let sent: Vec<_> = chat.messages.iter().filter(|m| m.text == "Olá").collect();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].is_pending());
    assert!(sent[0].from_me);
    assert!(sent[0].message_id.starts_with(&format!("{}_", chat.phone)));
    assert_eq!(chat.last_message, "Olá");

    let server_chat = harness.server.chat(1).unwrap();
    assert!(server_chat.message(&sent[0].message_id).is_some());
}

#[tokio::test]
async fn optimistic_send_updates_selected_copy() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;
    assert!(controller.select(1));

    assert!(controller.send(1, "Olá", true).await);
    let selected = controller.selected().unwrap();
    assert_eq!(selected.messages.len(), 2);
    assert_eq!(selected.messages, controller.chat(1).unwrap().messages);
    controller.shutdown();
}

#[tokio::test]
async fn failed_send_rolls_back() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;
    let before = controller.chat(1).unwrap();

    harness.server.set_offline(true);
    assert!(!controller.send(1, "Olá", true).await);

    let after = controller.chat(1).unwrap();
    assert_eq!(after.messages.len(), before.messages.len());
    assert_eq!(after.last_message, before.last_message);
    assert_eq!(after.last_message_time, before.last_message_time);
    assert_eq!(harness.notifier.errors(), vec!["Erro ao enviar mensagem"]);
}

#[tokio::test]
async fn blank_text_makes_no_request() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    assert!(!harness.controller.send(1, " \n\t ", true).await);
    assert!(!harness.controller.send(1, "", false).await);
    assert_eq!(harness.server.call_count(Endpoint::SendMessage(1)), 0);
    assert!(harness.notifier.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_selection_response_only_updates_list() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;

    harness.server.receive(1, "mensagem nova");
    harness.server.hold_fetches(1);

    assert!(controller.select(1));
    ControllerHarness::settle(TICK).await;
    assert_eq!(harness.server.call_count(Endpoint::GetChat(1)), 1);

    assert!(controller.select(2));
    ControllerHarness::settle(TICK).await;
    assert_eq!(controller.selected_id(), Some(2));

    harness.server.release_fetch(1);
    ControllerHarness::settle(TICK).await;

    let selected = controller.selected().unwrap();
    assert_eq!(selected.id, 2);
    assert_eq!(selected.name, "Bruno");

    let entry = controller.chat(1).unwrap();
    assert_eq!(entry.last_message, "mensagem nova");
    assert!(entry.messages.iter().any(|m| m.text == "mensagem nova"));
    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn confirmed_send_after_switching_chats_only_updates_list() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = harness.controller.clone();
    assert!(controller.select(1));
    ControllerHarness::settle(TICK).await;
    harness.server.hold_sends(1);

    let send = tokio::spawn({
        let controller = controller.clone();
        async move { controller.send(1, "resposta", true).await }
    });
    ControllerHarness::settle(TICK).await;
    assert!(controller.selected().unwrap().messages.iter().any(|m| m.is_pending()));

    assert!(controller.select(2));
    ControllerHarness::settle(TICK).await;
    harness.server.release_send(1);
    assert!(send.await.unwrap());

    let selected = controller.selected().unwrap();
    assert_eq!(selected.id, 2);
    assert_eq!(selected.messages.len(), 1);
    assert_eq!(selected.last_message, "bom dia");

    let entry = controller.chat(1).unwrap();
    assert_eq!(entry.messages.len(), 2);
    assert!(entry.messages.iter().all(|m| !m.is_pending()));
    assert_eq!(entry.last_message, "resposta");
    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn failed_send_after_switching_chats_restores_summary() {
    let mut chats = two_chats();
    chats.push(ChatBuilder::new(3).last("resumo anterior", 5).build());
    let harness = ControllerHarness::loaded(chats).await;
    let controller = harness.controller.clone();
    assert!(controller.select(3));
    ControllerHarness::settle(TICK).await;
    harness.server.hold_sends(3);

    let send = tokio::spawn({
        let controller = controller.clone();
        async move { controller.send(3, "nunca enviada", true).await }
    });
    ControllerHarness::settle(TICK).await;
    assert_eq!(controller.chat(3).unwrap().last_message, "nunca enviada");

    assert!(controller.select(2));
    ControllerHarness::settle(TICK).await;
    harness.server.set_offline(true);
    harness.server.release_send(3);
    assert!(!send.await.unwrap());

    let selected = controller.selected().unwrap();
    assert_eq!(selected.id, 2);
    assert_eq!(selected.messages.len(), 1);
    assert_eq!(selected.last_message, "bom dia");

    let entry = controller.chat(3).unwrap();
    assert!(entry.messages.is_empty());
    assert_eq!(entry.last_message, "resumo anterior");
    assert_eq!(entry.last_message_time, Some(at(5)));
    assert_eq!(
        harness.notifier.last().unwrap().message,
        "Erro ao enviar mensagem"
    );
    controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn stale_fetch_keeps_newer_local_message() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = harness.controller.clone();
    harness.server.hold_fetches(1);

    let fetch = tokio::spawn({
        let controller = controller.clone();
        async move { controller.refresh_chat(1).await }
    });
    ControllerHarness::settle(TICK).await;

    assert!(controller.send(1, "resposta", true).await);
    harness.server.release_fetch(1);
    assert_eq!(fetch.await.unwrap(), FetchOutcome::Applied);

    let entry = controller.chat(1).unwrap();
    assert_eq!(entry.last_message, "resposta");
    assert_eq!(entry.messages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn select_polls_immediately_then_every_interval() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;

    assert!(controller.select(1));
    assert_eq!(controller.selected_id(), Some(1));
    ControllerHarness::settle(TICK).await;
    assert_eq!(harness.server.call_count(Endpoint::GetChat(1)), 1);

    ControllerHarness::settle(Duration::from_secs(10)).await;
    assert_eq!(harness.server.call_count(Endpoint::GetChat(1)), 2);

    harness.server.receive(1, "chegou");
    ControllerHarness::settle(Duration::from_secs(10)).await;
    assert_eq!(controller.selected().unwrap().last_message, "chegou");

    controller.shutdown();
    ControllerHarness::settle(Duration::from_secs(60)).await;
    assert_eq!(harness.server.call_count(Endpoint::GetChat(1)), 3);
}

#[tokio::test(start_paused = true)]
async fn reselecting_replaces_polling() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;

    assert!(controller.select(1));
    assert!(controller.select(2));
    ControllerHarness::settle(Duration::from_secs(25)).await;

    // Chat 1 never ticked: its task was replaced before yielding.
    assert_eq!(harness.server.call_count(Endpoint::GetChat(1)), 0);
    assert_eq!(harness.server.call_count(Endpoint::GetChat(2)), 3);
    controller.shutdown();
}

#[tokio::test]
async fn select_unknown_chat_changes_nothing() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    assert!(harness.controller.select(1));
    assert!(!harness.controller.select(99));
    assert_eq!(harness.controller.selected_id(), Some(1));
    harness.controller.shutdown();
}

#[tokio::test(start_paused = true)]
async fn concurrent_fetch_is_skipped() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = harness.controller.clone();
    harness.server.hold_fetches(1);

    let first = tokio::spawn({
        let controller = controller.clone();
        async move { controller.refresh_chat(1).await }
    });
    ControllerHarness::settle(TICK).await;
    assert_eq!(controller.activity().loading_chat_id, Some(1));

    assert_eq!(controller.refresh_chat(1).await, FetchOutcome::Skipped);
    harness.server.release_fetch(1);
    assert_eq!(first.await.unwrap(), FetchOutcome::Applied);
    assert_eq!(harness.server.call_count(Endpoint::GetChat(1)), 1);
    assert_eq!(controller.activity().loading_chat_id, None);
}

#[tokio::test(start_paused = true)]
async fn fetch_cooldown_releases_after_delay() {
    let config = test_config().with_fetch_cooldown(Duration::from_secs(5));
    let harness = ControllerHarness::with_config(two_chats(), config);
    let controller = &harness.controller;

    assert_eq!(controller.refresh_chat(1).await, FetchOutcome::Applied);
    assert_eq!(controller.refresh_chat(1).await, FetchOutcome::Skipped);

    ControllerHarness::settle(Duration::from_secs(5) + TICK).await;
    assert_eq!(controller.refresh_chat(1).await, FetchOutcome::Applied);
}

#[tokio::test(start_paused = true)]
async fn shutdown_lets_outstanding_fetch_apply() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;
    harness.server.receive(1, "atrasada");
    harness.server.hold_fetches(1);

    assert!(controller.select(1));
    ControllerHarness::settle(TICK).await;
    controller.shutdown();
    assert!(!controller.is_polling());

    harness.server.release_fetch(1);
    ControllerHarness::settle(TICK).await;
    assert_eq!(controller.chat(1).unwrap().last_message, "atrasada");
    assert_eq!(controller.selected().unwrap().last_message, "atrasada");
}

#[tokio::test(start_paused = true)]
async fn dropping_controller_stops_polling() {
    let ControllerHarness {
        controller, server, ..
    } = ControllerHarness::loaded(two_chats()).await;

    assert!(controller.select(1));
    ControllerHarness::settle(TICK).await;
    drop(controller);

    ControllerHarness::settle(Duration::from_secs(60)).await;
    assert_eq!(server.call_count(Endpoint::GetChat(1)), 1);
}

#[tokio::test]
async fn status_update_applies_only_on_success() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;

    harness.server.fail_next("indisponível");
    assert!(
        !controller
            .update_status(1, ChatStatus::EmAtendimento, Some(TEST_AGENT.into()))
            .await
    );
    assert_eq!(controller.chat(1).unwrap().status, ChatStatus::Standby);

    assert!(
        controller
            .update_status(1, ChatStatus::EmAtendimento, Some(TEST_AGENT.into()))
            .await
    );
    let chat = controller.chat(1).unwrap();
    assert_eq!(chat.status, ChatStatus::EmAtendimento);
    assert_eq!(chat.atendente_id.as_deref(), Some(TEST_AGENT));
    assert_eq!(
        harness.notifier.successes(),
        vec!["Status atualizado com sucesso"]
    );
    assert_eq!(harness.notifier.errors(), vec!["Erro ao atualizar status"]);
}

#[tokio::test]
async fn create_or_find_replaces_existing_in_place() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;
    let phone = controller.chat(1).unwrap().phone;

    let found = controller
        .create_or_find(&phone, "ignored@c.us", "Ana")
        .await
        .unwrap();
    assert_eq!(found.id, 1);
    let ids: Vec<_> = controller.chats().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![2, 1]);

    let created = controller
        .create_or_find("+55 (21) 97777-6666", "5521977776666@c.us", "Carla")
        .await
        .unwrap();
    assert_eq!(created.phone, "5521977776666");
    assert_eq!(controller.chats()[0].id, created.id);
}

#[tokio::test]
async fn create_from_contact_defaults_channel_id() {
    let harness = ControllerHarness::loaded(vec![]).await;
    let chat = harness
        .controller
        .create_from_contact("(31) 98888-1111", "Davi", None)
        .await
        .unwrap();
    assert_eq!(chat.waha_id, "31988881111@c.us");

    assert!(harness
        .controller
        .create_from_contact("---", "Sem número", None)
        .await
        .is_none());
    assert_eq!(harness.server.call_count(Endpoint::CreateChat), 1);
}

#[tokio::test(start_paused = true)]
async fn deactivate_removes_chat_and_selection() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let controller = &harness.controller;
    assert!(controller.select(2));

    assert!(controller.deactivate(2).await);
    assert!(controller.chat(2).is_none());
    assert!(controller.selected().is_none());
    assert!(!controller.is_polling());
    assert_eq!(
        harness.notifier.last().map(|n| n.message),
        Some("Chat desativado com sucesso".to_string())
    );

    assert!(controller.refresh_list().await);
    assert!(controller.chat(2).is_none());
}

#[tokio::test]
async fn failed_list_fetch_keeps_store() {
    let harness = ControllerHarness::loaded(two_chats()).await;
    let revision = harness.controller.revision();

    harness.server.set_offline(true);
    assert!(!harness.controller.refresh_list().await);
    assert_eq!(harness.controller.chats().len(), 2);
    assert_eq!(harness.controller.revision(), revision);
    assert_eq!(harness.notifier.errors(), vec!["Erro ao carregar chats"]);
    assert_eq!(harness.controller.stats().failures, 1);
}

#[test]
fn harness_config_is_valid() {
    let config: SyncConfig = test_config();
    assert!(config.validate().is_ok());
    assert!(config.fetch_cooldown.is_zero());
}
