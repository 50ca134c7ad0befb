/*!

This is the long-form manual for `quiz_session` and `timedquiz`.

## Quiz source

The questions are read from the first worksheet of an Excel (.xlsx) file.
The first row is the header and must contain the following columns, in any
order:

* `Question`
* `Option 1`, `Option 2`, `Option 3`, `Option 4`
* `Correct Answer`: the exact text of the correct option

Other columns are ignored. All the cells are read as text: a numeric cell
`4` is the same as the text `4`.

The rows are shuffled once per session. If two rows have the same question
text, only one question is shown, with the options and the answer of the
last row.

## Results

Each submission appends one row to the results file, with the columns
`Participant 1`, `Participant 2`, `Phone`, `Email` and `Score`. The score
is the number of questions answered correctly; unanswered questions count
for nothing.

The results are written to two places, independently:
* a file in a GitHub repository, through the content API
* a local file

A failure to update the GitHub file is logged and otherwise ignored.

## Timer

The quiz closes after a fixed duration (60 seconds by default) counted from
the moment the participant details are entered. When the time runs out, the
answers given so far are submitted automatically.

*/
