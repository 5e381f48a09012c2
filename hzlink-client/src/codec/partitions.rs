//! Partition table (0x0008 / 0x6c) codec.

use hzlink_core::protocol::{
    calculate_size_str, ClientMessage, CLIENT_GET_PARTITIONS, INT_SIZE_IN_BYTES,
    PARTITIONS_RESPONSE, PARTITION_ID_NONE,
};
use hzlink_core::{hz_trace, Address, HzError, Result};

use super::{expect_response, prepare};
use crate::connection::Connection;

/// Partition ownership reported by the member.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartitionTable {
    members: Vec<(Address, Vec<i32>)>,
}

impl PartitionTable {
    /// Creates a table from member addresses and the partitions each owns.
    pub fn new(members: Vec<(Address, Vec<i32>)>) -> Self {
        Self { members }
    }

    /// Returns each member with the partitions it owns.
    pub fn members(&self) -> &[(Address, Vec<i32>)] {
        &self.members
    }

    /// Returns the total number of partitions in the cluster.
    pub fn partition_count(&self) -> i32 {
        self.members.iter().map(|(_, ids)| ids.len() as i32).sum()
    }

    /// Returns the member owning `partition_id`.
    pub fn owner_of(&self, partition_id: i32) -> Option<&Address> {
        self.members
            .iter()
            .find(|(_, ids)| ids.contains(&partition_id))
            .map(|(address, _)| address)
    }
}

/// Encodes a partition table request. It has no payload.
pub fn encode_request() -> ClientMessage {
    let mut message = ClientMessage::create_for_encode(0);
    message.set_message_type(CLIENT_GET_PARTITIONS);
    message.update_frame_length();
    message
}

/// Encodes a partition table response.
pub fn encode_response(table: &PartitionTable) -> ClientMessage {
    let size = INT_SIZE_IN_BYTES
        + table
            .members()
            .iter()
            .map(|(address, ids)| {
                calculate_size_str(address.host()) + 2 * INT_SIZE_IN_BYTES + ids.len() * INT_SIZE_IN_BYTES
            })
            .sum::<usize>();

    let mut message = ClientMessage::create_for_encode(size);
    message.set_message_type(PARTITIONS_RESPONSE);
    message.append_i32(table.members().len() as i32);
    for (address, ids) in table.members() {
        message.append_str(address.host());
        message.append_i32(i32::from(address.port()));
        message.append_i32(ids.len() as i32);
        for id in ids {
            message.append_i32(*id);
        }
    }
    message.update_frame_length();
    message
}

/// Decodes a partition table response.
pub fn decode_response(message: &mut ClientMessage) -> Result<PartitionTable> {
    let member_count = read_count(message, "member")?;
    let mut members = Vec::with_capacity(member_count.min(1024));
    for _ in 0..member_count {
        let host = message.read_string()?;
        let port = message.read_i32()?;
        let port = u16::try_from(port)
            .map_err(|_| HzError::Protocol(format!("member reported invalid port {port}")))?;
        let id_count = read_count(message, "partition")?;
        let mut ids = Vec::with_capacity(id_count.min(4096));
        for _ in 0..id_count {
            ids.push(message.read_i32()?);
        }
        members.push((Address::new(host, port), ids));
    }
    Ok(PartitionTable::new(members))
}

/// Requests the partition table and stores the partition count on the
/// connection.
pub async fn send_get_partitions(connection: &Connection) -> Result<PartitionTable> {
    let mut request = encode_request();
    prepare(connection, &mut request, PARTITION_ID_NONE);

    let response = connection.exchange(request).await?;
    let mut response = expect_response(connection, response, PARTITIONS_RESPONSE, "get partitions")?;
    let table = decode_response(&mut response)?;

    for (address, ids) in table.members() {
        hz_trace!(
            connection.logger(),
            "member {} owns {} partitions",
            address,
            ids.len()
        );
    }
    connection.set_partition_count(table.partition_count());
    hz_trace!(
        connection.logger(),
        "partition count for {} is {}",
        connection.address(),
        table.partition_count()
    );
    Ok(table)
}

fn read_count(message: &mut ClientMessage, what: &str) -> Result<usize> {
    let count = message.read_i32()?;
    usize::try_from(count).map_err(|_| HzError::Protocol(format!("negative {what} count {count}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reread(message: &ClientMessage) -> ClientMessage {
        ClientMessage::create_for_decode(message.as_bytes()).unwrap()
    }

    fn table() -> PartitionTable {
        PartitionTable::new(vec![
            (Address::new("10.0.0.1", 5701), vec![0, 2, 4]),
            (Address::new("10.0.0.2", 5701), vec![1, 3]),
        ])
    }

    #[test]
    fn test_partition_count_and_owner() {
        let table = table();
        assert_eq!(table.partition_count(), 5);
        assert_eq!(table.owner_of(3), Some(&Address::new("10.0.0.2", 5701)));
        assert_eq!(table.owner_of(4), Some(&Address::new("10.0.0.1", 5701)));
        assert_eq!(table.owner_of(99), None);
    }

    #[test]
    fn test_response_round_trip() {
        let encoded = encode_response(&table());
        assert_eq!(encoded.message_type(), PARTITIONS_RESPONSE);
        assert_eq!(encoded.frame_length() as usize, encoded.len());
        assert_eq!(decode_response(&mut reread(&encoded)).unwrap(), table());
    }

    #[test]
    fn test_empty_table() {
        let encoded = encode_response(&PartitionTable::default());
        let decoded = decode_response(&mut reread(&encoded)).unwrap();
        assert_eq!(decoded.partition_count(), 0);
    }

    #[test]
    fn test_negative_count_rejected() {
        let mut message = ClientMessage::create_for_encode(4);
        message.set_message_type(PARTITIONS_RESPONSE);
        message.append_i32(-3);
        message.update_frame_length();
        assert!(matches!(
            decode_response(&mut reread(&message)),
            Err(HzError::Protocol(_))
        ));
    }

    #[test]
    fn test_encode_request() {
        assert_eq!(encode_request().message_type(), CLIENT_GET_PARTITIONS);
    }
}
