use super::{CommError, Communicator, Rank};
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Barrier};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Broadcast,
    Reduce,
    PointToPoint,
}

#[derive(Debug)]
enum Payload {
    Reals(Vec<f64>),
    Counts(Vec<u64>),
}

#[derive(Debug)]
struct Packet {
    source: Rank,
    tag: Tag,
    payload: Payload,
}

/// In-process cluster: one scoped thread per rank.
pub struct LocalCluster;

impl LocalCluster {
    /// Runs `task` once per rank and returns the results in rank order.
    pub fn run<T, F>(size: usize, task: F) -> Vec<T>
    where
        T: Send,
        F: Fn(LocalCommunicator) -> T + Sync,
    {
        let communicators = Self::communicators(size);
        let task = &task;
        thread::scope(|scope| {
            let handles: Vec<_> = communicators
                .into_iter()
                .map(|communicator| scope.spawn(move || task(communicator)))
                .collect();
            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(value) => value,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    pub fn communicators(size: usize) -> Vec<LocalCommunicator> {
        let (senders, receivers): (Vec<Sender<Packet>>, Vec<Receiver<Packet>>) =
            (0..size).map(|_| unbounded()).unzip();
        let barrier = Arc::new(Barrier::new(size.max(1)));
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, inbox)| LocalCommunicator {
                rank,
                size,
                outboxes: senders.clone(),
                inbox,
                stash: RefCell::new(VecDeque::new()),
                barrier: Arc::clone(&barrier),
            })
            .collect()
    }
}

pub struct LocalCommunicator {
    rank: Rank,
    size: usize,
    outboxes: Vec<Sender<Packet>>,
    inbox: Receiver<Packet>,
    stash: RefCell<VecDeque<Packet>>,
    barrier: Arc<Barrier>,
}

impl LocalCommunicator {
    fn post(&self, destination: Rank, tag: Tag, payload: Payload) -> Result<(), CommError> {
        let outbox = self
            .outboxes
            .get(destination)
            .ok_or(CommError::InvalidRank {
                rank: destination,
                size: self.size,
            })?;
        outbox
            .send(Packet {
                source: self.rank,
                tag,
                payload,
            })
            .map_err(|_| CommError::Disconnected { peer: destination })
    }

    fn receive_matching(
        &self,
        tag: Tag,
        source: Option<Rank>,
    ) -> Result<Packet, CommError> {
        let matches =
            |packet: &Packet| packet.tag == tag && source.is_none_or(|rank| rank == packet.source);

        {
            let mut stash = self.stash.borrow_mut();
            if let Some(position) = stash.iter().position(matches) {
                if let Some(packet) = stash.remove(position) {
                    return Ok(packet);
                }
            }
        }

        loop {
            let packet = self.inbox.recv().map_err(|_| CommError::Disconnected {
                peer: source.unwrap_or(self.rank),
            })?;
            if matches(&packet) {
                return Ok(packet);
            }
            self.stash.borrow_mut().push_back(packet);
        }
    }

    fn broadcast_payload(&self, payload: Option<Payload>) -> Result<Payload, CommError> {
        let root = self.root();
        match payload {
            Some(payload) if self.rank == root => {
                for destination in (0..self.size).filter(|rank| *rank != root) {
                    let copy = match &payload {
                        Payload::Reals(values) => Payload::Reals(values.clone()),
                        Payload::Counts(values) => Payload::Counts(values.clone()),
                    };
                    self.post(destination, Tag::Broadcast, copy)?;
                }
                Ok(payload)
            }
            _ => Ok(self.receive_matching(Tag::Broadcast, Some(root))?.payload),
        }
    }
}

impl Communicator for LocalCommunicator {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn broadcast_reals(&self, values: &mut Vec<f64>) -> Result<(), CommError> {
        let outgoing = self
            .is_root()
            .then(|| Payload::Reals(std::mem::take(values)));
        match self.broadcast_payload(outgoing)? {
            Payload::Reals(received) => {
                *values = received;
                Ok(())
            }
            Payload::Counts(_) => Err(CommError::PayloadMismatch {
                peer: self.root(),
                expected: "real",
            }),
        }
    }

    fn broadcast_counts(&self, values: &mut Vec<u64>) -> Result<(), CommError> {
        let outgoing = self
            .is_root()
            .then(|| Payload::Counts(std::mem::take(values)));
        match self.broadcast_payload(outgoing)? {
            Payload::Counts(received) => {
                *values = received;
                Ok(())
            }
            Payload::Reals(_) => Err(CommError::PayloadMismatch {
                peer: self.root(),
                expected: "count",
            }),
        }
    }

    fn reduce_sum(&self, value: u64) -> Result<Option<u64>, CommError> {
        if !self.is_root() {
            self.post(self.root(), Tag::Reduce, Payload::Counts(vec![value]))?;
            return Ok(None);
        }

        let mut total = value;
        for peer in (0..self.size).filter(|rank| *rank != self.rank) {
            match self.receive_matching(Tag::Reduce, Some(peer))?.payload {
                Payload::Counts(values) if values.len() == 1 => total += values[0],
                Payload::Counts(values) => {
                    return Err(CommError::LengthMismatch {
                        peer,
                        expected: 1,
                        actual: values.len(),
                    });
                }
                Payload::Reals(_) => {
                    return Err(CommError::PayloadMismatch {
                        peer,
                        expected: "count",
                    });
                }
            }
        }
        Ok(Some(total))
    }

    fn reduce_max(&self, values: &[f64]) -> Result<Option<Vec<f64>>, CommError> {
        if !self.is_root() {
            self.post(self.root(), Tag::Reduce, Payload::Reals(values.to_vec()))?;
            return Ok(None);
        }

        let mut maxima = values.to_vec();
        for peer in (0..self.size).filter(|rank| *rank != self.rank) {
            let received = match self.receive_matching(Tag::Reduce, Some(peer))?.payload {
                Payload::Reals(received) => received,
                Payload::Counts(_) => {
                    return Err(CommError::PayloadMismatch {
                        peer,
                        expected: "real",
                    });
                }
            };
            if received.len() != maxima.len() {
                return Err(CommError::LengthMismatch {
                    peer,
                    expected: maxima.len(),
                    actual: received.len(),
                });
            }
            for (current, candidate) in maxima.iter_mut().zip(received) {
                *current = current.max(candidate);
            }
        }
        Ok(Some(maxima))
    }

    fn send(&self, destination: Rank, values: &[f64]) -> Result<(), CommError> {
        self.post(destination, Tag::PointToPoint, Payload::Reals(values.to_vec()))
    }

    fn receive_any(&self) -> Result<(Rank, Vec<f64>), CommError> {
        let packet = self.receive_matching(Tag::PointToPoint, None)?;
        match packet.payload {
            Payload::Reals(values) => Ok((packet.source, values)),
            Payload::Counts(_) => Err(CommError::PayloadMismatch {
                peer: packet.source,
                expected: "real",
            }),
        }
    }

    fn barrier(&self) -> Result<(), CommError> {
        self.barrier.wait();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LocalCluster;
    use crate::parallel::{CommError, Communicator};

    #[test]
    fn broadcast_reaches_every_rank() {
        let results = LocalCluster::run(4, |comm| {
            let mut values = if comm.is_root() {
                vec![1.5, -2.0, 3.25]
            } else {
                Vec::new()
            };
            comm.broadcast_reals(&mut values).expect("broadcast should succeed");
            let mut counts = if comm.is_root() { vec![3, 1] } else { vec![9] };
            comm.broadcast_counts(&mut counts).expect("broadcast should succeed");
            (values, counts)
        });

        for (values, counts) in results {
            assert_eq!(values, vec![1.5, -2.0, 3.25]);
            assert_eq!(counts, vec![3, 1]);
        }
    }

    #[test]
    fn reductions_land_at_root_only() {
        let results = LocalCluster::run(3, |comm| {
            let rank = comm.rank() as u64;
            let sum = comm.reduce_sum(rank + 1).expect("reduce should succeed");
            let max = comm
                .reduce_max(&[rank as f64, -(rank as f64), if rank == 1 { 7.0 } else { -1.0 }])
                .expect("reduce should succeed");
            (sum, max)
        });

        assert_eq!(results[0].0, Some(6));
        assert_eq!(results[0].1, Some(vec![2.0, 0.0, 7.0]));
        for (sum, max) in &results[1..] {
            assert_eq!(*sum, None);
            assert_eq!(*max, None);
        }
    }

    #[test]
    fn point_to_point_messages_do_not_overtake_collectives() {
        let results = LocalCluster::run(3, |comm| {
            if !comm.is_root() {
                comm.send(0, &[comm.rank() as f64]).expect("send should succeed");
            }
            let total = comm.reduce_sum(1).expect("reduce should succeed");
            let mut received = Vec::new();
            if comm.is_root() {
                for _ in 0..comm.size() - 1 {
                    let (source, values) = comm.receive_any().expect("receive should succeed");
                    assert_eq!(values, vec![source as f64]);
                    received.push(source);
                }
            }
            comm.barrier().expect("barrier should succeed");
            received.sort_unstable();
            (total, received)
        });

        assert_eq!(results[0], (Some(3), vec![1, 2]));
    }

    #[test]
    fn sending_to_unknown_rank_fails() {
        let results = LocalCluster::run(1, |comm| comm.send(5, &[1.0]));
        assert_eq!(
            results[0],
            Err(CommError::InvalidRank { rank: 5, size: 1 })
        );
    }

    #[test]
    fn single_rank_collectives_are_local() {
        let results = LocalCluster::run(1, |comm| {
            let mut values = vec![4.0];
            comm.broadcast_reals(&mut values).expect("broadcast should succeed");
            let sum = comm.reduce_sum(11).expect("reduce should succeed");
            comm.barrier().expect("barrier should succeed");
            (values, sum)
        });
        assert_eq!(results[0], (vec![4.0], Some(11)));
    }
}
