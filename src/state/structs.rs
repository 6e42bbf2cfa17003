// structs.rs - structures of main state
//
// minimal-irc-server - minimal IRC server
// Copyright (C) 2025  Leon Zipp
//
// This library is free software; you can redistribute it and/or
// modify it under the terms of the GNU Lesser General Public
// License as published by the Free Software Foundation; either
// version 2.1 of the License, or (at your option) any later version.
//
// This library is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
// Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public
// License along with this library; if not, write to the Free Software
// Foundation, Inc., 51 Franklin Street, Fifth Floor, Boston, MA  02110-1301  USA

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::ops::Drop;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::codec::Framed;
use tracing::*;

use crate::utils::IrcLinesCodec;

/// Opaque connection handle. The index points into the registry arena and the
/// generation invalidates handles of closed connections whose slot was reused.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ConnId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
pub(super) struct Client {
    pub(super) hostname: String,
    pub(super) sender: UnboundedSender<String>,
    pub(super) nick: Option<String>,
    pub(super) name: Option<String>,
    pub(super) realname: Option<String>,
    pub(super) source: String, // IRC source for message prefixes
    pub(super) channels: HashSet<String>,
}

impl Client {
    pub(super) fn new(user_state: &ConnUserState, sender: UnboundedSender<String>) -> Client {
        Client {
            hostname: user_state.hostname.clone(),
            sender,
            nick: user_state.nick.clone(),
            name: user_state.name.clone(),
            realname: user_state.realname.clone(),
            source: user_state.source.clone(),
            channels: HashSet::new(),
        }
    }

    // mirror nick, name and source after NICK or USER changed them.
    pub(super) fn update_user_state(&mut self, user_state: &ConnUserState) {
        self.nick = user_state.nick.clone();
        self.name = user_state.name.clone();
        self.realname = user_state.realname.clone();
        self.source = user_state.source.clone();
    }

    pub(super) fn client_name(&self) -> &str {
        if let Some(ref n) = self.nick {
            n
        } else if let Some(ref n) = self.name {
            n
        } else {
            &self.hostname
        }
    }

    // a failed send means the peer is mid-teardown, the message is dropped.
    pub(super) fn send_msg_display<T: fmt::Display>(&self, source: &str, t: T) {
        if self.sender.send(format!(":{} {}", source, t)).is_err() {
            debug!("Queue for {} is closed", self.client_name());
        }
    }
}

#[derive(Debug)]
struct ClientSlot {
    generation: u32,
    client: Option<Client>,
}

/// Arena of connected clients. Slots of removed clients are reused after
/// bumping their generation, so stale ConnId handles never resolve.
#[derive(Debug, Default)]
pub(super) struct ClientRegistry {
    slots: Vec<ClientSlot>,
    free: Vec<u32>,
}

impl ClientRegistry {
    pub(super) fn new() -> ClientRegistry {
        ClientRegistry::default()
    }

    pub(super) fn insert(&mut self, client: Client) -> ConnId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.client = Some(client);
            ConnId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(ClientSlot {
                generation: 0,
                client: Some(client),
            });
            ConnId {
                index,
                generation: 0,
            }
        }
    }

    pub(super) fn get(&self, conn_id: ConnId) -> Option<&Client> {
        self.slots
            .get(conn_id.index as usize)
            .filter(|slot| slot.generation == conn_id.generation)
            .and_then(|slot| slot.client.as_ref())
    }

    pub(super) fn get_mut(&mut self, conn_id: ConnId) -> Option<&mut Client> {
        self.slots
            .get_mut(conn_id.index as usize)
            .filter(|slot| slot.generation == conn_id.generation)
            .and_then(|slot| slot.client.as_mut())
    }

    pub(super) fn remove(&mut self, conn_id: ConnId) -> Option<Client> {
        let slot = self
            .slots
            .get_mut(conn_id.index as usize)
            .filter(|slot| slot.generation == conn_id.generation)?;
        let client = slot.client.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(conn_id.index);
        Some(client)
    }

    pub(super) fn find_by_nick(&self, nick: &str) -> Option<ConnId> {
        self.iter()
            .find(|(_, client)| client.nick.as_deref() == Some(nick))
            .map(|(conn_id, _)| conn_id)
    }

    pub(super) fn contains_nick(&self, nick: &str) -> bool {
        self.find_by_nick(nick).is_some()
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = (ConnId, &Client)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.client.as_ref().map(|client| {
                (
                    ConnId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    client,
                )
            })
        })
    }

    pub(super) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ChannelTopic {
    pub(super) topic: String,
    pub(super) nick: String,
    pub(super) set_time: u64,
}

impl ChannelTopic {
    pub(super) fn new_with_nick(topic: String, nick: String) -> Self {
        ChannelTopic {
            topic,
            nick,
            set_time: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct Channel {
    pub(super) topic: Option<ChannelTopic>,
    pub(super) invite_only: bool,
    pub(super) protected_topic: bool,
    pub(super) key: Option<String>,
    pub(super) client_limit: Option<usize>,
    pub(super) members: HashSet<ConnId>,
    pub(super) operators: HashSet<ConnId>,
    pub(super) invited: HashSet<ConnId>,
}

impl Channel {
    // the creating client becomes member and operator. a key supplied at
    // creation becomes the channel key.
    pub(super) fn new_on_client_join(conn_id: ConnId, key: Option<String>) -> Channel {
        Channel {
            topic: None,
            invite_only: false,
            protected_topic: false,
            key,
            client_limit: None,
            members: [conn_id].into(),
            operators: [conn_id].into(),
            invited: HashSet::new(),
        }
    }

    // joining consumes a pending invite.
    pub(super) fn add_member(&mut self, conn_id: ConnId) {
        self.members.insert(conn_id);
        self.invited.remove(&conn_id);
    }

    // leaving revokes operator status and any pending invite, so the
    // operator and invited sets stay subsets of the member set.
    pub(super) fn remove_member(&mut self, conn_id: ConnId) {
        self.members.remove(&conn_id);
        self.operators.remove(&conn_id);
        self.invited.remove(&conn_id);
    }

    pub(super) fn is_member(&self, conn_id: ConnId) -> bool {
        self.members.contains(&conn_id)
    }

    pub(super) fn is_operator(&self, conn_id: ConnId) -> bool {
        self.operators.contains(&conn_id)
    }

    // only members can hold operator status.
    pub(super) fn add_operator(&mut self, conn_id: ConnId) {
        if self.members.contains(&conn_id) {
            self.operators.insert(conn_id);
        }
    }

    pub(super) fn remove_operator(&mut self, conn_id: ConnId) {
        self.operators.remove(&conn_id);
    }

    pub(super) fn add_invite(&mut self, conn_id: ConnId) {
        self.invited.insert(conn_id);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ConnUserState {
    pub(super) ip_addr: IpAddr,
    pub(super) hostname: String,
    pub(super) name: Option<String>,
    pub(super) realname: Option<String>,
    pub(super) nick: Option<String>,
    pub(super) source: String, // IRC source for message prefixes
    pub(super) authenticated: bool,
    pub(super) registered: bool,
}

impl ConnUserState {
    pub(super) fn new(ip_addr: IpAddr) -> ConnUserState {
        let mut source = "@".to_string();
        source.push_str(&ip_addr.to_string());
        ConnUserState {
            ip_addr,
            hostname: ip_addr.to_string(),
            name: None,
            realname: None,
            nick: None,
            source,
            authenticated: false,
            registered: false,
        }
    }

    pub(super) fn client_name(&self) -> &str {
        if let Some(ref n) = self.nick {
            n
        } else if let Some(ref n) = self.name {
            n
        } else {
            &self.hostname
        }
    }

    pub(super) fn update_source(&mut self) {
        let mut s = String::new();
        // generate source - nick!username@host
        if let Some(ref nick) = self.nick {
            s.push_str(nick);
            s.push('!');
        }
        if let Some(ref name) = self.name {
            s.push('~'); // username is not verified
            s.push_str(name);
        }
        s.push('@');
        s.push_str(&self.hostname);
        self.source = s;
    }

    pub(super) fn set_name(&mut self, name: String) {
        self.name = Some(name);
        self.update_source();
    }

    pub(super) fn set_nick(&mut self, nick: String) {
        self.nick = Some(nick);
        self.update_source();
    }
}

#[derive(Debug)]
pub(crate) struct ConnState {
    pub(super) stream: Framed<TcpStream, IrcLinesCodec>,
    pub(super) sender: Option<UnboundedSender<String>>,
    pub(super) receiver: UnboundedReceiver<String>,
    // receives the server-wide shutdown notification.
    pub(super) shutdown_receiver: broadcast::Receiver<()>,
    pub(super) user_state: ConnUserState,
    pub(super) conn_id: Option<ConnId>,
    pub(super) quit: bool,
    pub(super) conns_count: Arc<AtomicUsize>,
}

impl ConnState {
    pub(super) fn new(
        ip_addr: IpAddr,
        stream: Framed<TcpStream, IrcLinesCodec>,
        shutdown_receiver: broadcast::Receiver<()>,
        conns_count: Arc<AtomicUsize>,
    ) -> ConnState {
        let (sender, receiver) = unbounded_channel();
        ConnState {
            stream,
            sender: Some(sender),
            receiver,
            shutdown_receiver,
            user_state: ConnUserState::new(ip_addr),
            conn_id: None,
            quit: false,
            conns_count,
        }
    }

    pub(crate) fn is_quit(&self) -> bool {
        self.quit
    }
}

impl Drop for ConnState {
    fn drop(&mut self) {
        self.conns_count.fetch_sub(1, Ordering::SeqCst);
    }
}

pub(super) struct VolatileState {
    pub(super) clients: ClientRegistry,
    pub(super) channels: HashMap<String, Channel>,
}

impl VolatileState {
    pub(super) fn new() -> VolatileState {
        VolatileState {
            clients: ClientRegistry::new(),
            channels: HashMap::new(),
        }
    }

    // remove client from channel and remove channel from client.
    // an emptied channel stays registered, its topic and modes survive.
    pub(super) fn remove_client_from_channel(&mut self, channel: &str, conn_id: ConnId) {
        if let Some(chanobj) = self.channels.get_mut(channel) {
            chanobj.remove_member(conn_id);
            if chanobj.members.is_empty() {
                info!("Channel {} is now empty", channel);
            }
        }
        if let Some(client) = self.clients.get_mut(conn_id) {
            client.channels.remove(channel);
        }
    }

    // members of all channels shared with the client, without the client
    // itself. used for NICK and QUIT broadcasts.
    pub(super) fn shared_channel_members(&self, conn_id: ConnId) -> HashSet<ConnId> {
        let mut members = HashSet::new();
        if let Some(client) = self.clients.get(conn_id) {
            for chname in &client.channels {
                if let Some(channel) = self.channels.get(chname) {
                    members.extend(channel.members.iter().copied());
                }
            }
        }
        members.remove(&conn_id);
        members
    }

    // remove client - including its channel memberships.
    pub(super) fn remove_client(&mut self, conn_id: ConnId) -> Option<Client> {
        let channels = self
            .clients
            .get(conn_id)
            .map(|client| client.channels.clone())?;
        channels.iter().for_each(|chname| {
            self.remove_client_from_channel(chname, conn_id);
        });
        self.clients.remove(conn_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::iter::FromIterator;

    fn new_client(nick: &str) -> Client {
        let mut user_state = ConnUserState::new("127.0.0.1".parse().unwrap());
        user_state.set_name(nick.to_string());
        user_state.set_nick(nick.to_string());
        let (sender, _) = unbounded_channel();
        Client::new(&user_state, sender)
    }

    #[test]
    fn test_client_send_msg_display_closed_queue() {
        let mut user_state = ConnUserState::new("127.0.0.1".parse().unwrap());
        user_state.set_name("alice".to_string());
        user_state.set_nick("alice".to_string());
        let (sender, mut receiver) = unbounded_channel();
        let client = Client::new(&user_state, sender);

        client.send_msg_display("bob!~bob@127.0.0.1", "PRIVMSG alice :hi");
        assert_eq!(
            Some(":bob!~bob@127.0.0.1 PRIVMSG alice :hi".to_string()),
            receiver.try_recv().ok()
        );
        // a message to a torn down peer is dropped without an error
        drop(receiver);
        client.send_msg_display("bob!~bob@127.0.0.1", "PRIVMSG alice :hi again");
    }

    #[test]
    fn test_client_registry_insert_get_remove() {
        let mut registry = ClientRegistry::new();
        let alice = registry.insert(new_client("alice"));
        let bob = registry.insert(new_client("bob"));
        assert_eq!(2, registry.len());
        assert_eq!(
            Some("alice"),
            registry.get(alice).and_then(|c| c.nick.as_deref())
        );
        assert_eq!(
            Some("bob"),
            registry.get(bob).and_then(|c| c.nick.as_deref())
        );

        let removed = registry.remove(alice);
        assert_eq!(Some("alice"), removed.and_then(|c| c.nick).as_deref());
        assert_eq!(1, registry.len());
        assert!(registry.get(alice).is_none());
        assert!(registry.remove(alice).is_none());
    }

    #[test]
    fn test_client_registry_stale_handle_after_reuse() {
        let mut registry = ClientRegistry::new();
        let alice = registry.insert(new_client("alice"));
        registry.remove(alice);
        // slot is reused with a bumped generation
        let celia = registry.insert(new_client("celia"));
        assert_ne!(alice, celia);
        assert!(registry.get(alice).is_none());
        assert!(registry.get_mut(alice).is_none());
        assert!(registry.remove(alice).is_none());
        assert_eq!(
            Some("celia"),
            registry.get(celia).and_then(|c| c.nick.as_deref())
        );
        assert_eq!(1, registry.len());
    }

    #[test]
    fn test_client_registry_find_by_nick() {
        let mut registry = ClientRegistry::new();
        let alice = registry.insert(new_client("alice"));
        let bob = registry.insert(new_client("bob"));
        assert_eq!(Some(alice), registry.find_by_nick("alice"));
        assert_eq!(Some(bob), registry.find_by_nick("bob"));
        assert_eq!(None, registry.find_by_nick("celia"));
        assert!(registry.contains_nick("alice"));
        registry.remove(alice);
        assert_eq!(None, registry.find_by_nick("alice"));
        assert_eq!(
            HashSet::from(["bob".to_string()]),
            HashSet::from_iter(registry.iter().filter_map(|(_, c)| c.nick.clone()))
        );
    }

    #[test]
    fn test_channel_new_on_client_join() {
        let mut registry = ClientRegistry::new();
        let alice = registry.insert(new_client("alice"));
        let channel = Channel::new_on_client_join(alice, Some("melon".to_string()));
        assert_eq!(
            Channel {
                topic: None,
                invite_only: false,
                protected_topic: false,
                key: Some("melon".to_string()),
                client_limit: None,
                members: [alice].into(),
                operators: [alice].into(),
                invited: HashSet::new(),
            },
            channel
        );
        assert!(channel.is_member(alice));
        assert!(channel.is_operator(alice));
    }

    #[test]
    fn test_channel_add_remove_member() {
        let mut registry = ClientRegistry::new();
        let alice = registry.insert(new_client("alice"));
        let bob = registry.insert(new_client("bob"));

        let mut channel = Channel::new_on_client_join(alice, None);
        channel.add_invite(bob);
        assert!(channel.invited.contains(&bob));
        channel.add_member(bob);
        // joining consumed the invite
        assert!(!channel.invited.contains(&bob));
        assert!(channel.is_member(bob));
        assert!(!channel.is_operator(bob));

        channel.add_operator(bob);
        assert!(channel.is_operator(bob));

        // removal revokes operator status too
        channel.remove_member(bob);
        assert!(!channel.is_member(bob));
        assert!(!channel.is_operator(bob));

        // operator status requires membership
        channel.add_operator(bob);
        assert!(!channel.is_operator(bob));
    }

    #[test]
    fn test_conn_user_state() {
        let mut cus = ConnUserState::new("192.168.1.7".parse().unwrap());
        assert_eq!(
            ConnUserState {
                ip_addr: "192.168.1.7".parse().unwrap(),
                hostname: "192.168.1.7".to_string(),
                name: None,
                realname: None,
                nick: None,
                source: "@192.168.1.7".to_string(),
                authenticated: false,
                registered: false
            },
            cus
        );
        assert_eq!("192.168.1.7", cus.client_name());
        cus.set_name("boro".to_string());
        assert_eq!("~boro@192.168.1.7", cus.source);
        assert_eq!("boro", cus.client_name());
        cus.set_nick("buru".to_string());
        assert_eq!("buru!~boro@192.168.1.7", cus.source);
        assert_eq!("buru", cus.client_name());
    }

    #[test]
    fn test_volatile_state_remove_client_from_channel() {
        let mut state = VolatileState::new();
        let alice = state.clients.insert(new_client("alice"));
        let bob = state.clients.insert(new_client("bob"));

        let mut channel = Channel::new_on_client_join(alice, None);
        channel.add_member(bob);
        state.channels.insert("#fruits".to_string(), channel);
        state
            .clients
            .get_mut(alice)
            .unwrap()
            .channels
            .insert("#fruits".to_string());
        state
            .clients
            .get_mut(bob)
            .unwrap()
            .channels
            .insert("#fruits".to_string());

        state.remove_client_from_channel("#fruits", bob);
        assert!(state.channels.contains_key("#fruits"));
        assert!(!state.clients.get(bob).unwrap().channels.contains("#fruits"));

        // last member leaves, the channel stays registered
        state.remove_client_from_channel("#fruits", alice);
        let fruits = state.channels.get("#fruits").unwrap();
        assert!(fruits.members.is_empty());
        assert!(fruits.operators.is_empty());
    }

    #[test]
    fn test_volatile_state_shared_channel_members() {
        let mut state = VolatileState::new();
        let alice = state.clients.insert(new_client("alice"));
        let bob = state.clients.insert(new_client("bob"));
        let celia = state.clients.insert(new_client("celia"));

        let mut fruits = Channel::new_on_client_join(alice, None);
        fruits.add_member(bob);
        state.channels.insert("#fruits".to_string(), fruits);
        let mut veggies = Channel::new_on_client_join(alice, None);
        veggies.add_member(celia);
        state.channels.insert("&veggies".to_string(), veggies);
        state.clients.get_mut(alice).unwrap().channels =
            ["#fruits".to_string(), "&veggies".to_string()].into();
        state
            .clients
            .get_mut(bob)
            .unwrap()
            .channels
            .insert("#fruits".to_string());
        state
            .clients
            .get_mut(celia)
            .unwrap()
            .channels
            .insert("&veggies".to_string());

        assert_eq!(
            HashSet::from([bob, celia]),
            state.shared_channel_members(alice)
        );
        assert_eq!(HashSet::from([alice]), state.shared_channel_members(bob));
    }

    #[test]
    fn test_volatile_state_remove_client() {
        let mut state = VolatileState::new();
        let alice = state.clients.insert(new_client("alice"));
        let bob = state.clients.insert(new_client("bob"));

        let mut channel = Channel::new_on_client_join(alice, None);
        channel.add_member(bob);
        state.channels.insert("#fruits".to_string(), channel);
        state
            .channels
            .insert("&alone".to_string(), Channel::new_on_client_join(alice, None));
        state.clients.get_mut(alice).unwrap().channels =
            ["#fruits".to_string(), "&alone".to_string()].into();
        state
            .clients
            .get_mut(bob)
            .unwrap()
            .channels
            .insert("#fruits".to_string());

        let removed = state.remove_client(alice);
        assert_eq!(Some("alice"), removed.and_then(|c| c.nick).as_deref());
        assert!(state.clients.get(alice).is_none());
        // both channels survive, memberships are gone
        assert!(state.channels.get("&alone").unwrap().members.is_empty());
        let fruits = state.channels.get("#fruits").unwrap();
        assert_eq!(HashSet::from([bob]), fruits.members);
        // operator set no longer contains the removed creator
        assert!(fruits.operators.is_empty());

        assert!(state.remove_client(alice).is_none());
    }
}
