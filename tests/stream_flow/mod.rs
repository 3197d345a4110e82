mod coalescing_test;
mod sse_test;
