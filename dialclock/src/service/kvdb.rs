/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Key/value store service, the firmware's persistence backend.
//!
//! A flat `key → value` map serialized as YAML. The file is read once at
//! registration; mutations stay in memory until an explicit `Save` or the
//! `AppStopped` broadcast flushes them, so a pulled plug costs at most the
//! unsaved delta.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use databroker::{BrokerError, DataBroker, EventParam, Handled, Interest, NodeError, NodeHandle};
use tracing::{debug, error, info, warn};

use crate::message::{GlobalInfo, KvdbInfo, KvdbValue, Message};
use crate::service::ids;

type Store = HashMap<String, KvdbValue>;

fn load(path: &Path) -> Store {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Store>(&content) {
            Ok(store) => {
                info!(keys = store.len(), path = %path.display(), "store loaded");
                store
            }
            Err(err) => {
                warn!(path = %path.display(), %err, "store file unreadable, starting empty");
                Store::new()
            }
        },
        Err(_) => {
            info!(path = %path.display(), "no store file yet, starting empty");
            Store::new()
        }
    }
}

fn persist(path: &Path, store: &Store) -> Result<()> {
    let content = serde_yaml::to_string(store).context("serializing store")?;
    std::fs::write(path, content)
        .with_context(|| format!("writing store file: {}", path.display()))?;
    Ok(())
}

pub fn register(
    broker: &DataBroker<Message>,
    path: PathBuf,
) -> Result<NodeHandle<Message>, BrokerError> {
    let node = broker.add(ids::KVDB)?;

    let mut store = load(&path);
    let mut dirty = false;

    node.set_event_callback(
        move |_node, param| match param {
            EventParam::Notify { message } => match message {
                Message::Kvdb(cmd) => match cmd {
                    KvdbInfo::Set { key, value } => {
                        if matches!(value, KvdbValue::Empty) {
                            return Err(NodeError::InvalidParam);
                        }
                        debug!(key, "store set");
                        store.insert(key.clone(), value.clone());
                        dirty = true;
                        Ok(Handled::Ok)
                    }
                    KvdbInfo::Del { key } => match store.remove(key) {
                        Some(_) => {
                            debug!(key, "store del");
                            dirty = true;
                            Ok(Handled::Ok)
                        }
                        None => Err(NodeError::NoData),
                    },
                    KvdbInfo::List => {
                        info!(keys = store.len(), "store listing");
                        for key in store.keys() {
                            info!("  {key}");
                        }
                        Ok(Handled::Ok)
                    }
                    KvdbInfo::Save => match persist(&path, &store) {
                        Ok(()) => {
                            info!(keys = store.len(), path = %path.display(), "store saved");
                            dirty = false;
                            Ok(Handled::Ok)
                        }
                        Err(err) => {
                            error!(%err, "store save failed");
                            Err(NodeError::Unknown)
                        }
                    },
                    KvdbInfo::Get { .. } => Err(NodeError::Unsupported),
                },
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Pull { message } => match message {
                Message::Kvdb(KvdbInfo::Get { key, value }) => match store.get(key) {
                    Some(stored) => {
                        *value = stored.clone();
                        Ok(Handled::Ok)
                    }
                    None => Err(NodeError::NoData),
                },
                _ => Err(NodeError::TypeMismatch),
            },
            EventParam::Publish { message, .. } => {
                if matches!(message, Message::Global(GlobalInfo::AppStopped)) && dirty {
                    match persist(&path, &store) {
                        Ok(()) => {
                            info!("store flushed at shutdown");
                            dirty = false;
                        }
                        Err(err) => error!(%err, "shutdown flush failed"),
                    }
                }
                Ok(Handled::Ok)
            }
            _ => Err(NodeError::Unsupported),
        },
        Interest::NOTIFY | Interest::PULL | Interest::PUBLISH,
    );

    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::fake::fake_tick;
    use tempfile::TempDir;

    fn setup(path: PathBuf) -> (DataBroker<Message>, NodeHandle<Message>, NodeHandle<Message>) {
        let broker: DataBroker<Message> = DataBroker::new();
        let (_clock_ms, tick) = fake_tick();
        broker.init_timer_manager(tick);
        let kvdb = register(&broker, path).unwrap();
        let caller = broker.add("Caller").unwrap();
        (broker, kvdb, caller)
    }

    fn get(caller: &NodeHandle<Message>, kvdb: &NodeHandle<Message>, key: &str) -> Option<KvdbValue> {
        let mut query = Message::Kvdb(KvdbInfo::Get {
            key: key.to_owned(),
            value: KvdbValue::Empty,
        });
        match caller.pull(kvdb, &mut query) {
            Ok(_) => match query {
                Message::Kvdb(KvdbInfo::Get { value, .. }) => Some(value),
                _ => None,
            },
            Err(_) => None,
        }
    }

    #[test]
    fn set_get_del_round_trip() {
        let dir = TempDir::new().unwrap();
        let (_broker, kvdb, caller) = setup(dir.path().join("store.yaml"));

        caller
            .notify(
                &kvdb,
                &Message::Kvdb(KvdbInfo::Set {
                    key: "greeting".into(),
                    value: KvdbValue::Text("hello".into()),
                }),
            )
            .unwrap();
        assert_eq!(
            get(&caller, &kvdb, "greeting"),
            Some(KvdbValue::Text("hello".into()))
        );

        caller
            .notify(&kvdb, &Message::Kvdb(KvdbInfo::Del { key: "greeting".into() }))
            .unwrap();
        assert_eq!(get(&caller, &kvdb, "greeting"), None);
    }

    #[test]
    fn missing_key_is_no_data() {
        let dir = TempDir::new().unwrap();
        let (_broker, kvdb, caller) = setup(dir.path().join("store.yaml"));

        let mut query = Message::Kvdb(KvdbInfo::Get {
            key: "missing".into(),
            value: KvdbValue::Empty,
        });
        assert_eq!(caller.pull(&kvdb, &mut query), Err(NodeError::NoData));
        assert_eq!(
            caller.notify(&kvdb, &Message::Kvdb(KvdbInfo::Del { key: "missing".into() })),
            Err(NodeError::NoData)
        );
    }

    #[test]
    fn empty_value_is_rejected() {
        let dir = TempDir::new().unwrap();
        let (_broker, kvdb, caller) = setup(dir.path().join("store.yaml"));

        assert_eq!(
            caller.notify(
                &kvdb,
                &Message::Kvdb(KvdbInfo::Set {
                    key: "k".into(),
                    value: KvdbValue::Empty,
                })
            ),
            Err(NodeError::InvalidParam)
        );
    }

    #[test]
    fn save_persists_across_a_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.yaml");

        {
            let (_broker, kvdb, caller) = setup(path.clone());
            caller
                .notify(
                    &kvdb,
                    &Message::Kvdb(KvdbInfo::Set {
                        key: "blob".into(),
                        value: KvdbValue::Blob(vec![1, 2, 3]),
                    }),
                )
                .unwrap();
            caller.notify(&kvdb, &Message::Kvdb(KvdbInfo::Save)).unwrap();
        }

        let (_broker, kvdb, caller) = setup(path);
        assert_eq!(
            get(&caller, &kvdb, "blob"),
            Some(KvdbValue::Blob(vec![1, 2, 3]))
        );
    }

    #[test]
    fn app_stopped_flushes_dirty_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.yaml");

        {
            let (_broker, kvdb, caller) = setup(path.clone());
            caller
                .notify(
                    &kvdb,
                    &Message::Kvdb(KvdbInfo::Set {
                        key: "k".into(),
                        value: KvdbValue::Text("v".into()),
                    }),
                )
                .unwrap();
            caller
                .publish(&Message::Global(GlobalInfo::AppStopped))
                .unwrap();
        }
        assert!(path.exists());

        let (_broker, kvdb, caller) = setup(path);
        assert_eq!(get(&caller, &kvdb, "k"), Some(KvdbValue::Text("v".into())));
    }

    #[test]
    fn corrupt_store_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.yaml");
        std::fs::write(&path, ":{ not yaml ]").unwrap();

        let (_broker, kvdb, caller) = setup(path);
        assert_eq!(get(&caller, &kvdb, "anything"), None);
    }
}
