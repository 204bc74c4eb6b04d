/*!
# Tokio integration

Canonicalization itself never blocks on I/O once the document is in memory,
so the async entry point reads the whole input, canonicalizes it in one go
and then writes the result.
*/
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::driver::canonicalize_bytes;
use crate::error::Result;
use crate::options::Options;

/**
Canonicalize the document read from `input` into `output`.

The output is only written to if canonicalization succeeded. The output is
shut down in any case; if canonicalization failed, errors from shutting it
down are only logged.

```
# tokio_test::block_on(async {
use smev_transform::{process_async, Options};

let mut out = Vec::new();
process_async(&b"<a xmlns='urn:x'/>"[..], &mut out, &Options::default()).await.unwrap();
assert_eq!(&out[..], &b"<ns1:a xmlns:ns1=\"urn:x\"></ns1:a>"[..]);
# })
```
*/
pub async fn process_async<R, W>(mut input: R, mut output: W, options: &Options) -> Result<()>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	let mut data = Vec::new();
	let result = match input.read_to_end(&mut data).await {
		Ok(_) => canonicalize_bytes(&data, options),
		Err(e) => Err(e.into()),
	};
	match result {
		Ok(canonical) => {
			output.write_all(&canonical).await?;
			output.shutdown().await?;
			Ok(())
		}
		Err(e) => {
			if let Err(shutdown_err) = output.shutdown().await {
				warn!(error = %shutdown_err, "failed to shut down output after error");
			}
			Err(e)
		}
	}
}
