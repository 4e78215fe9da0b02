//! End-to-end scenarios exercising the facade as a whole client would.

use memfs::{Error, SimpleFs, MAX_DATA_SIZE};

#[test]
fn create_stack_order() {
    let fs = SimpleFs::init(12);
    for name in ["file 1", "file 2", "file 3", "file 4"] {
        fs.create(name).unwrap();
    }
    assert_eq!(fs.dir(), vec!["file 4", "file 3", "file 2", "file 1"]);
}

#[test]
fn duplicate_name_is_rejected() {
    let fs = SimpleFs::init(4);
    fs.create("name").unwrap();
    assert_eq!(fs.create("name").unwrap_err(), Error::NonUniqueName);
    assert_eq!(fs.dir().len(), 1);
}

#[test]
fn write_then_read_round_trip() {
    let fs = SimpleFs::init(8);
    let handle = fs.create("file 1").unwrap();
    fs.write(&handle, b"asdfasdf").unwrap();
    let (buf, n) = fs.read(&handle, 8).unwrap();
    assert_eq!(n, 8);
    assert_eq!(&buf, b"asdfasdf");

    fs.write(&handle, b"asdfasdf").unwrap();
    let (buf, n) = fs.read(&handle, 16).unwrap();
    assert_eq!(n, 16);
    assert_eq!(&buf, b"asdfasdfasdfasdf");
}

#[test]
fn multi_block_write_splits_at_block_boundary() {
    assert_eq!(MAX_DATA_SIZE, 504);
    let fs = SimpleFs::init(16);
    let handle = fs.create("big").unwrap();
    let payload = vec![b'a'; 1000];
    fs.write(&handle, &payload).unwrap();

    let (buf, n) = fs.read(&handle, 1000).unwrap();
    assert_eq!(n, 1000);
    assert_eq!(buf, payload);

    // A short read confirms the first block alone holds exactly MAX_DATA_SIZE bytes.
    let (buf, n) = fs.read(&handle, MAX_DATA_SIZE).unwrap();
    assert_eq!(n, MAX_DATA_SIZE);
    assert!(buf.iter().all(|&b| b == b'a'));
}

#[test]
fn delete_in_arbitrary_order() {
    let fs = SimpleFs::init(4);
    for name in ["file 1", "file 2", "file 3", "file 4"] {
        let h = fs.create(name).unwrap();
        fs.close(&h).unwrap();
    }

    fs.delete("file 3").unwrap();
    assert_eq!(fs.dir()[0], "file 4");
    assert_eq!(fs.dir().len(), 3);

    fs.delete("file 4").unwrap();
    assert_eq!(fs.dir()[0], "file 2");

    fs.delete("file 2").unwrap();
    assert_eq!(fs.dir()[0], "file 1");

    fs.delete("file 1").unwrap();
    assert_eq!(fs.dir().len(), 0);
    assert_eq!(fs.delete("file 1").unwrap_err(), Error::NotExists);
}

#[test]
fn delete_while_open_is_rejected() {
    let fs = SimpleFs::init(4);
    let handle = fs.create("open file").unwrap();
    assert_eq!(fs.delete("open file").unwrap_err(), Error::FileOpen);
    fs.close(&handle).unwrap();
    fs.delete("open file").unwrap();
}

#[test]
fn delete_frees_entire_data_chain() {
    // Pool sized so that only the file node plus its two data blocks fit;
    // a leaked chain link would make the subsequent allocation fail.
    let fs = SimpleFs::init(3);
    let handle = fs.create("big").unwrap();
    fs.write(&handle, &vec![b'a'; 1000]).unwrap();
    fs.close(&handle).unwrap();
    fs.delete("big").unwrap();

    // All three blocks must be free again.
    let handle = fs.create("a").unwrap();
    fs.write(&handle, &vec![b'b'; 1000]).unwrap();
    let (_, n) = fs.read(&handle, 1000).unwrap();
    assert_eq!(n, 1000);
}

#[test]
fn read_on_unopened_handle_fails_after_close() {
    let fs = SimpleFs::init(4);
    let handle = fs.create("f").unwrap();
    fs.close(&handle).unwrap();
    assert_eq!(fs.read(&handle, 1).unwrap_err(), Error::FileNotOpen);
    assert_eq!(fs.write(&handle, b"x").unwrap_err(), Error::FileNotOpen);
}

#[test]
fn name_length_exceeded_is_rejected_and_block_is_reclaimed() {
    let fs = SimpleFs::init(1);
    let long_name = "x".repeat(memfs::MAX_FILENAME_LENGTH + 1);
    assert_eq!(
        fs.create(&long_name).unwrap_err(),
        Error::NameLengthExceeded
    );
    // The single block must have been reclaimed, not leaked.
    fs.create("ok").unwrap();
}

#[test]
fn oom_when_pool_exhausted() {
    let fs = SimpleFs::init(1);
    fs.create("only").unwrap();
    assert_eq!(fs.create("second").unwrap_err(), Error::Oom);
}
