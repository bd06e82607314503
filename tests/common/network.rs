//! Scripted IRC server side.

use std::time::Duration;

use bantracker_proto::Message;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// Listening socket the bot connects to.
pub struct FakeNetwork {
    listener: TcpListener,
}

impl FakeNetwork {
    /// Bind on an ephemeral local port.
    pub async fn bind() -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(Self { listener })
    }

    /// Port to put in the bot's config.
    pub fn port(&self) -> anyhow::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// Wait for the bot to connect.
    pub async fn accept(&self) -> anyhow::Result<BotLink> {
        let (stream, _) = timeout(Duration::from_secs(10), self.listener.accept()).await??;
        let (read_half, write_half) = stream.into_split();
        Ok(BotLink {
            reader: BufReader::new(read_half),
            writer: write_half,
        })
    }
}

/// One accepted bot connection.
pub struct BotLink {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl BotLink {
    /// Send a raw line to the bot.
    pub async fn send_raw(&mut self, line: &str) -> anyhow::Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send several raw lines.
    pub async fn send_all(&mut self, lines: &[&str]) -> anyhow::Result<()> {
        for line in lines {
            self.send_raw(line).await?;
        }
        Ok(())
    }

    /// Receive one line from the bot.
    pub async fn recv(&mut self) -> anyhow::Result<Message> {
        let mut line = String::new();
        let read = timeout(Duration::from_secs(5), self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("bot closed the connection");
        }
        line.trim_end()
            .parse::<Message>()
            .map_err(|e| anyhow::anyhow!("Parse error: {}", e))
    }

    /// Receive until `predicate` matches; returns the matching message.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Message>
    where
        F: FnMut(&Message) -> bool,
    {
        loop {
            let msg = self.recv().await?;
            if predicate(&msg) {
                return Ok(msg);
            }
        }
    }

    /// Receive until a message with `command` arrives.
    pub async fn expect_command(&mut self, command: &str) -> anyhow::Result<Message> {
        self.recv_until(|m| m.command == command).await
    }

    /// Drive registration with capability negotiation and send the welcome
    /// burst. Returns the bot's JOIN.
    pub async fn register(&mut self) -> anyhow::Result<Message> {
        self.expect_command("USER").await?;
        self.send_raw(":irc.test CAP * LS :multi-prefix userhost-in-names away-notify")
            .await?;

        let req = self.expect_command("CAP").await?;
        anyhow::ensure!(req.param(0) == Some("REQ"), "expected CAP REQ, got {req}");
        let caps = req.param(1).unwrap_or_default().to_string();
        self.send_raw(&format!(":irc.test CAP bot ACK :{caps}")).await?;

        let end = self.expect_command("CAP").await?;
        anyhow::ensure!(end.param(0) == Some("END"), "expected CAP END, got {end}");

        self.send_all(&[
            ":irc.test 001 bot :Welcome to the test network",
            ":irc.test 005 bot PREFIX=(ov)@+ CHANMODES=beIq,k,l,imnpst MODES=3 CASEMAPPING=rfc1459 :are supported",
        ])
        .await?;
        self.expect_command("JOIN").await
    }

    /// Complete a join of `#test`: echo the JOIN, send NAMES, then answer
    /// the WHO and the ban list query with `bans` (`mask setter time`).
    pub async fn join_test_channel(&mut self, names: &str, bans: &[&str]) -> anyhow::Result<()> {
        self.send_all(&[
            ":bot!b@bot.host JOIN #test",
            &format!(":irc.test 353 bot = #test :{names}"),
            ":irc.test 366 bot #test :End of /NAMES list.",
        ])
        .await?;

        self.expect_command("WHO").await?;
        self.send_raw(":irc.test 315 bot #test :End of /WHO list.").await?;

        let query = self.expect_command("MODE").await?;
        anyhow::ensure!(
            query.param(0) == Some("#test") && query.param(1) == Some("b"),
            "expected ban list query, got {query}"
        );
        for ban in bans {
            self.send_raw(&format!(":irc.test 367 bot #test {ban}")).await?;
        }
        self.send_raw(":irc.test 368 bot #test :End of Channel Ban List").await
    }
}
