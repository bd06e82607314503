//! End-to-end tests: the real binary against a scripted server.

mod common;

use common::{FakeNetwork, TestBot};

#[tokio::test]
async fn tracks_new_ban_and_accepts_comment_from_setter() {
    let network = FakeNetwork::bind().await.expect("bind");
    let _bot = TestBot::spawn(network.port().expect("port"), "").expect("spawn bot");

    let mut link = network.accept().await.expect("bot connects");
    let join = link.register().await.expect("registration");
    assert_eq!(join.param(0), Some("#test"));
    link.join_test_channel("bot @op!o@op.host", &[])
        .await
        .expect("join");

    link.send_raw(":op!o@op.host MODE #test +b *!*@spam.host")
        .await
        .unwrap();
    let notice = link.expect_command("NOTICE").await.unwrap();
    assert_eq!(notice.param(0), Some("op"));
    let text = notice.param(1).unwrap().to_string();
    assert!(text.starts_with("Ban "), "unexpected notice {text}");
    assert!(text.ends_with(" added for #test"), "unexpected notice {text}");
    let id: i64 = text
        .split(' ')
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("notice carries the id");

    link.send_raw(":op!o@op.host PRIVMSG #test :!comment ^ +1h spamming links")
        .await
        .unwrap();
    let reply = link.expect_command("NOTICE").await.unwrap();
    assert_eq!(
        reply.param(1),
        Some(format!("Set reason and duration for ban {id} (*!*@spam.host)").as_str())
    );

    link.send_raw(&format!(":rando!r@elsewhere PRIVMSG bot :!comment {id} not mine"))
        .await
        .unwrap();
    let denied = link.expect_command("NOTICE").await.unwrap();
    assert_eq!(denied.param(0), Some("rando"));
    assert_eq!(denied.param(1), Some("You do not have permission to do this"));
}

#[tokio::test]
async fn kicks_unprivileged_members_matching_a_new_ban() {
    let network = FakeNetwork::bind().await.expect("bind");
    let _bot = TestBot::spawn(network.port().expect("port"), "enforce = true").expect("spawn bot");

    let mut link = network.accept().await.expect("bot connects");
    link.register().await.expect("registration");
    link.join_test_channel(
        "@bot @op!o@op.host +friend!f@spam.host spammer!s@SPAM.host bystander!b@clean.host",
        &[],
    )
    .await
    .expect("join");

    link.send_raw(":op!o@op.host MODE #test +b *!*@spam.host")
        .await
        .unwrap();
    let kick = link.expect_command("KICK").await.unwrap();
    assert_eq!(kick.param(0), Some("#test"));
    assert_eq!(kick.param(1), Some("spammer"));
    assert_eq!(kick.param(2), Some("User is banned from this channel"));

    // Nothing else gets kicked: the next line from the bot answers a PING.
    link.send_raw("PING :sync").await.unwrap();
    let next = link.recv_until(|m| m.command != "NOTICE").await.unwrap();
    assert_eq!(next.command, "PONG");
}

#[tokio::test]
async fn ban_lifted_while_away_is_expired_on_rejoin() {
    let network = FakeNetwork::bind().await.expect("bind");
    let bot = TestBot::spawn(network.port().expect("port"), "").expect("spawn bot");

    // First visit: the server reports a ban the bot has never seen.
    {
        let mut link = network.accept().await.expect("bot connects");
        link.register().await.expect("registration");
        link.join_test_channel("bot", &["gone!*@* op!o@op.host 1700000000"])
            .await
            .expect("join");
        bot.wait_for_rows("gone!*@*", |rows| rows == [true])
            .await
            .expect("ban recorded");
    }

    // Connection dropped; on the next visit the ban is no longer listed.
    let mut link = network.accept().await.expect("bot reconnects");
    link.register().await.expect("registration");
    link.join_test_channel("bot", &[]).await.expect("join");

    let rows = bot
        .wait_for_rows("gone!*@*", |rows| rows == [false])
        .await
        .expect("ban expired");
    assert_eq!(rows, vec![false]);
}
