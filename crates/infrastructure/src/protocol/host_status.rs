//! Parser for Zebra `~HS` host-status replies.
//!
//! The printer answers with three STX/ETX framed, comma-separated strings:
//!
//! ```text
//! <STX>aaa,b,c,dddd,eee,f,g,h,iii,j,k,l<ETX>
//! <STX>mmm,n,o,p,q,r,s,t,uuuuuuuu,v,www<ETX>
//! <STX>xxxx,y<ETX>
//! ```
//!
//! Only the first two carry status flags. Some firmware in line-print mode drops the framing
//! bytes, so unframed CR/LF separated replies are accepted as well.

use domain::PrinterError;
use domain::printer::PrinterStatus;

const STX: u8 = 0x02;
const ETX: u8 = 0x03;

/// Split a reply into frame payloads.
fn frames(reply: &[u8]) -> Vec<String> {
    if reply.contains(&STX) {
        let mut out = Vec::new();
        let mut current: Option<Vec<u8>> = None;
        for &b in reply {
            match b {
                STX => current = Some(Vec::new()),
                ETX => {
                    if let Some(frame) = current.take() {
                        out.push(String::from_utf8_lossy(&frame).into_owned());
                    }
                }
                _ => {
                    if let Some(frame) = current.as_mut() {
                        frame.push(b);
                    }
                }
            }
        }
        out
    } else {
        String::from_utf8_lossy(reply)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }
}

fn flag(fields: &[&str], index: usize) -> bool {
    fields.get(index).map(|f| f.trim() == "1").unwrap_or(false)
}

/// Parse a `~HS` reply into a `PrinterStatus`.
pub fn parse_host_status(reply: &[u8]) -> Result<PrinterStatus, PrinterError> {
    let frames = frames(reply);
    if frames.len() < 2 {
        return Err(PrinterError::invalid(format!(
            "host status reply has {} frame(s), expected 3",
            frames.len()
        )));
    }

    let first: Vec<&str> = frames[0].split(',').collect();
    let second: Vec<&str> = frames[1].split(',').collect();
    if first.len() < 12 || second.len() < 9 {
        return Err(PrinterError::invalid("host status reply is truncated"));
    }

    let labels_remaining = second[8]
        .trim()
        .parse::<u32>()
        .map_err(|_| PrinterError::invalid(format!("bad label count {:?}", second[8])))?;

    Ok(PrinterStatus {
        paper_out: flag(&first, 1),
        paused: flag(&first, 2),
        buffer_full: flag(&first, 5),
        under_temperature: flag(&first, 10),
        over_temperature: flag(&first, 11),
        head_open: flag(&second, 2),
        ribbon_out: flag(&second, 3),
        labels_remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const READY: &[u8] = b"\x02030,0,0,1245,000,0,0,0,000,0,0,0\x03\r\n\
\x02000,0,0,0,0,2,4,0,00000000,1,000\x03\r\n\
\x021234,0\x03\r\n";

    #[test]
    fn test_ready_printer() {
        let status = parse_host_status(READY).unwrap();
        assert!(status.is_ready());
        assert_eq!(status.labels_remaining, 0);
    }

    #[test]
    fn test_fault_flags() {
        let reply = b"\x02030,1,1,1245,000,1,0,0,000,0,1,1\x03\r\n\
\x02000,0,1,1,0,2,4,0,00000012,1,000\x03\r\n\
\x021234,0\x03\r\n";
        let status = parse_host_status(reply).unwrap();
        assert!(status.paper_out);
        assert!(status.paused);
        assert!(status.buffer_full);
        assert!(status.under_temperature);
        assert!(status.over_temperature);
        assert!(status.head_open);
        assert!(status.ribbon_out);
        assert_eq!(status.labels_remaining, 12);
        assert!(!status.is_ready());
    }

    #[test]
    fn test_unframed_reply() {
        let reply = b"030,1,0,1245,000,0,0,0,000,0,0,0\r\n000,0,0,0,0,2,4,0,00000000,1,000\r\n";
        let status = parse_host_status(reply).unwrap();
        assert!(status.paper_out);
    }

    #[test]
    fn test_garbage_between_frames_is_skipped() {
        let mut reply = b"\r\n\r\n".to_vec();
        reply.extend_from_slice(READY);
        assert!(parse_host_status(&reply).unwrap().is_ready());
    }

    #[test]
    fn test_short_reply_is_rejected() {
        assert!(parse_host_status(b"").is_err());
        assert!(parse_host_status(b"\x02030,0,0\x03").is_err());
        assert!(parse_host_status(b"\x02030,0,0\x03\x02000,0\x03").is_err());
    }
}
