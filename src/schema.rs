use sea_query::Iden;

/// Media table - one row per HLS sequence number
#[derive(Iden, Clone, Copy)]
pub enum Media {
    Table,
    Seqno,
    Current,
    Position,
    Notfound,
    Noback,
    Bandwidth,
    Size,
    #[iden = "m3u8ms"]
    M3u8ms,
    Hdrms,
    Chunkms,
    Data,
}

/// Comment table - chat events, deduplicated by hash
#[derive(Iden, Clone, Copy)]
pub enum Comment {
    Table,
    Vpos,
    Date,
    DateUsec,
    #[iden = "date2"]
    Date2,
    No,
    Anonymity,
    UserId,
    Content,
    Mail,
    Premium,
    Score,
    Thread,
    Origin,
    Locale,
    Hash,
}

/// Kvs table - key-value store for out-of-band session facts
#[derive(Iden, Clone, Copy)]
pub enum Kvs {
    Table,
    K,
    V,
}
